//! # GRIDLINK Networking - The Simulated Wire
//!
//! In-game computer network: routers, node interfaces, sockets and a
//! packet-routing fabric, all advanced by the discrete tick clock.
//!
//! ## Architecture
//!
//! - **Addressing**: [`NetId`] (subnet + host id) and [`Address`] (net id + port)
//! - **Interfaces**: [`NodeNetInterface`] endpoints hang off subnet-aware
//!   [`RouterNetInterface`]s; routers reach other subnets through neighbours or
//!   a [`Backbone`]
//! - **Sockets**: TCP-like sessions with handshake, keepalive and teardown,
//!   owned per computer by a [`SocketRegistry`]
//! - **World**: [`NetworkWorld`] owns every entity in generational slabs and
//!   drains the packet outbox until the network is quiet
//!
//! ## Tick Order
//!
//! ```text
//! 1. tick += 1
//! 2. for each computer: advance socket schedulers ("network", then "process")
//! 3. route every emitted packet hop by hop, delivering replies recursively
//! ```
//!
//! Everything a tick triggers settles before [`NetworkWorld::tick`] returns,
//! except user payloads, which handlers observe one tick after they arrive.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gridlink_networking::{NetworkWorld, NetworkConfig, PortListener, Address};
//!
//! let mut world = NetworkWorld::new(NetworkConfig::default());
//! let router = world.add_router(10);
//! let server = world.add_computer("server");
//! let client = world.add_computer("client");
//! let server_id = world.attach_computer(server, router, 1)?;
//! world.attach_computer(client, router, 2)?;
//!
//! world.add_listener(server, PortListener::new(80, || |payload: &Payload, replies: &mut Replies| {
//!     replies.send(payload.clone());
//! }))?;
//!
//! let socket = world.create_socket(client, Address::new(server_id, 80)?, None)?;
//! world.connect(client, socket)?; // handshake settles before this returns
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod address;
pub mod computer;
pub mod config;
pub mod error;
pub mod ids;
pub mod interface;
pub mod packet;
pub mod routing;
pub mod snapshot;
pub mod socket;
pub mod topology;
pub mod world;

// Re-exports for convenience
pub use address::{Address, NetId, EPHEMERAL_PORTS};
pub use computer::{Computer, OperatingSystem};
pub use config::{NetworkConfig, RoutingConfig, SocketTimings};
pub use error::{AddressError, ConfigError, NetworkError, NetworkResult};
pub use ids::{BackboneId, ComputerId, NodeId, RouterId, SocketId};
pub use interface::{Backbone, NodeNetInterface, RouterNetInterface};
pub use packet::{ControlFrame, Frame, Hop, Packet, Payload, RoutedPacket};
pub use routing::{Delivery, DropReason};
pub use snapshot::{EntityRecord, WorldSnapshot};
pub use socket::{
    ConnectionDecision, NetContext, PacketHandler, PortListener, Replies, Socket,
    SocketConnectionListener, SocketRegistry, SocketState, SocketTask,
};
pub use topology::Topology;
pub use world::{NetworkWorld, WorldStats};
