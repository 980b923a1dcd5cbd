//! # Network Interfaces
//!
//! Plain data records for the three kinds of network entity. Links between
//! them are only changed through [`Topology`](crate::Topology), which keeps
//! both ends of every link in agreement.

mod backbone;
mod node;
mod router;

pub use backbone::Backbone;
pub use node::NodeNetInterface;
pub use router::RouterNetInterface;
