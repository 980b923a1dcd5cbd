//! # Networking Error Types
//!
//! Configuration errors are returned synchronously. Protocol violations and
//! unreachable destinations never show up here: the first forces a socket
//! disconnect, the second silently drops the packet.

use thiserror::Error;

use gridlink_core::ScheduleError;

use crate::address::NetId;
use crate::ids::{BackboneId, ComputerId, NodeId, RouterId, SocketId};
use crate::socket::SocketState;

/// Address construction and parsing failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Ports must be in 1-65535.
    #[error("invalid port {0}: ports must be in 1-65535")]
    InvalidPort(u32),

    /// Text did not match `subnet.id` or `subnet.id:port`.
    #[error("malformed address: {0}")]
    Malformed(String),
}

/// Errors raised by topology, socket and world operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Invalid address.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// Scheduler rejected a task.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Computer handle is stale or unknown.
    #[error("unknown computer {0}")]
    UnknownComputer(ComputerId),

    /// Node handle is stale or unknown.
    #[error("unknown node interface {0}")]
    UnknownNode(NodeId),

    /// Router handle is stale or unknown.
    #[error("unknown router {0}")]
    UnknownRouter(RouterId),

    /// Backbone handle is stale or unknown.
    #[error("unknown backbone {0}")]
    UnknownBackbone(BackboneId),

    /// No live socket with this ID on the registry.
    #[error("unknown socket {0}")]
    UnknownSocket(SocketId),

    /// A net id must live in the subnet of the node's router.
    #[error("net id {net_id} does not belong to router subnet {router_subnet}")]
    SubnetMismatch {
        /// The rejected net id.
        net_id: NetId,
        /// Subnet of the connected router.
        router_subnet: u32,
    },

    /// Another node already holds this net id.
    #[error("net id {0} already assigned")]
    NetIdInUse(NetId),

    /// Routers cannot neighbour themselves.
    #[error("router {0} cannot be linked to itself")]
    SelfLink(RouterId),

    /// Another live socket already uses this local port towards this destination.
    #[error("local port {port} already in use towards {destination}")]
    PortInUse {
        /// Requested local port.
        port: u16,
        /// Destination of the clashing socket.
        destination: crate::address::Address,
    },

    /// User payloads may only be sent on connected sockets.
    #[error("socket {socket} is not connected (state: {state})")]
    NotConnected {
        /// The socket.
        socket: SocketId,
        /// Its current state.
        state: SocketState,
    },

    /// Operation not valid in the socket's current state.
    #[error("cannot {operation} socket {socket} in state {state}")]
    InvalidState {
        /// The socket.
        socket: SocketId,
        /// Its current state.
        state: SocketState,
        /// Rejected operation.
        operation: &'static str,
    },

    /// The computer's node interface has no net id, so nothing can be sent.
    #[error("local node interface has no net id")]
    Unaddressed,

    /// The network module has been shut down.
    #[error("network module is not running")]
    ModuleOffline,

    /// A snapshot record is inconsistent.
    #[error("invalid snapshot: {0}")]
    Snapshot(String),
}

/// Result type for networking operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Configuration loading failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Could not read the file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML did not match the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
