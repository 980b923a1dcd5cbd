//! Payload handlers attached to connected sockets.

use crate::packet::Payload;

/// Receives user payloads, one tick after they arrive.
///
/// Handlers cannot touch the socket directly. Anything they want done goes
/// through [`Replies`] and is applied once the handler returns.
pub trait PacketHandler {
    /// Called once per buffered payload, in arrival order.
    fn handle_payload(&mut self, payload: &Payload, replies: &mut Replies);
}

impl<F> PacketHandler for F
where
    F: FnMut(&Payload, &mut Replies),
{
    fn handle_payload(&mut self, payload: &Payload, replies: &mut Replies) {
        self(payload, replies);
    }
}

/// Actions a handler requests on its socket.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Replies {
    outgoing: Vec<Payload>,
    disconnect: bool,
}

impl Replies {
    /// Queues a payload to send back to the peer.
    pub fn send(&mut self, payload: impl Into<Payload>) {
        self.outgoing.push(payload.into());
    }

    /// Closes the socket after the queued payloads are sent.
    pub fn disconnect(&mut self) {
        self.disconnect = true;
    }

    /// Returns true if nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outgoing.is_empty() && !self.disconnect
    }

    pub(crate) fn into_parts(self) -> (Vec<Payload>, bool) {
        (self.outgoing, self.disconnect)
    }
}
