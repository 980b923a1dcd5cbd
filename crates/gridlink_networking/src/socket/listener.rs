//! Inbound connection policy.

use super::handler::PacketHandler;
use super::session::Socket;
use crate::packet::{ControlFrame, Frame, Packet};

/// A listener's answer to an unmatched inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionDecision {
    /// No opinion.
    Skip,
    /// Accept unless a later listener rejects.
    AllowAfterAll,
    /// Reject now; later listeners are not asked.
    RejectImmediately,
}

/// Decides which inbound connections a registry accepts.
///
/// A socket is created for an unmatched packet only if at least one listener
/// allows it and none rejects it first.
pub trait SocketConnectionListener {
    /// Called for a packet that matches no live socket.
    fn on_connection_request(&mut self, request: &Packet) -> ConnectionDecision;

    /// Called when any socket of the registry reaches `Connected`.
    fn on_connected(&mut self, _socket: &mut Socket) {}
}

type HandlerFactory = Box<dyn FnMut() -> Box<dyn PacketHandler>>;

/// Accepts handshakes on one port and gives every inbound session a fresh
/// handler. Outbound sockets bound to the same port are left alone.
pub struct PortListener {
    port: u16,
    factory: HandlerFactory,
    accepted: u64,
}

impl PortListener {
    /// Creates a listener; `factory` builds the handler for each session.
    pub fn new<F, H>(port: u16, mut factory: F) -> Self
    where
        F: FnMut() -> H + 'static,
        H: PacketHandler + 'static,
    {
        Self {
            port,
            factory: Box::new(move || Box::new(factory()) as Box<dyn PacketHandler>),
            accepted: 0,
        }
    }

    /// Port served.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Sessions that reached `Connected` on this port.
    #[must_use]
    pub const fn accepted(&self) -> u64 {
        self.accepted
    }
}

impl std::fmt::Debug for PortListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortListener")
            .field("port", &self.port)
            .field("accepted", &self.accepted)
            .finish_non_exhaustive()
    }
}

impl SocketConnectionListener for PortListener {
    fn on_connection_request(&mut self, request: &Packet) -> ConnectionDecision {
        let is_syn = matches!(request.frame(), Frame::Control(ControlFrame::Syn { .. }));
        if is_syn && request.destination().port() == self.port {
            ConnectionDecision::AllowAfterAll
        } else {
            ConnectionDecision::Skip
        }
    }

    fn on_connected(&mut self, socket: &mut Socket) {
        if socket.is_accepted() && socket.local_port() == self.port {
            socket.add_boxed_handler((self.factory)());
            self.accepted += 1;
        }
    }
}
