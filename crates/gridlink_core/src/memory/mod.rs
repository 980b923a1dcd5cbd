//! # Memory Management
//!
//! Handle-addressed storage for world entities.
//!
//! ## Design Philosophy
//!
//! Routers, nodes and computers reference each other in cycles. Instead of
//! shared pointers, every entity lives in a [`Slab`] and is referenced by a
//! [`SlotId`]:
//! - No reference counting, no interior mutability
//! - Stale handles are detected through a generation counter
//! - Iteration order is slot order, which keeps the simulation deterministic

mod slab;

pub use slab::{Slab, SlotId};
