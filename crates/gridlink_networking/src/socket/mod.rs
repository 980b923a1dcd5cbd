//! # Sockets
//!
//! TCP-like sessions over the simulated network. Each computer owns one
//! [`SocketRegistry`]; every socket inside it runs the handshake, keepalive
//! and teardown protocol on its own [`Scheduler`](gridlink_core::Scheduler).
//!
//! ## Handshake
//!
//! ```text
//! initiator                         responder
//!    | connect()                        |
//!    |--- SYN(seq=a) ------------------>|  listeners allow -> socket created
//!    |<-- SYN-ACK(seq=b, ack=a+1) ------|
//!    |--- ACK(ack=b+1) ---------------->|
//! CONNECTED                         CONNECTED
//! ```
//!
//! The whole exchange settles inside the world's outbox drain, so a
//! handshake between reachable computers completes within the tick that
//! started it.

mod context;
mod handler;
mod listener;
mod registry;
mod session;
mod state;

pub use context::NetContext;
pub use handler::{PacketHandler, Replies};
pub use listener::{ConnectionDecision, PortListener, SocketConnectionListener};
pub use registry::SocketRegistry;
pub use session::{
    Socket, SocketTask, GROUP_NETWORK, GROUP_PROCESS, TASK_CONNECTION_TIMEOUT, TASK_DELIVER,
    TASK_KEEPALIVE, TASK_KEEPALIVE_TIMEOUT,
};
pub use state::SocketState;
