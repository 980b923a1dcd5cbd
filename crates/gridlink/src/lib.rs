//! # GRIDLINK
//!
//! The main simulation crate, tying the kernel and the simulated wire together.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       gridlink_server                        │
//! │                                                              │
//! │   ServerConfig ──> TickDriver<Demo> ──> NetworkWorld::tick   │
//! │                          │                                   │
//! │                          └──> Demo::drive_client             │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │   gridlink_core              │   gridlink_networking         │
//! │   • Slab / SlotId            │   • Topology + routing        │
//! │   • Scheduler                │   • Sockets + registry        │
//! │   • TickDriver               │   • World + snapshots         │
//! └──────────────────────────────┴───────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: server-wide TOML configuration
//! - `demo`: the world the server runs out of the box

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod demo;

// Re-export the layers
pub use gridlink_core as core;
pub use gridlink_networking as networking;

pub use config::{DemoConfig, ServerConfig};
pub use demo::Demo;
