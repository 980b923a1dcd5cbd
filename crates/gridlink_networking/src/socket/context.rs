//! Per-call environment handed to sockets.

use rand::RngCore;

use crate::address::NetId;
use crate::config::SocketTimings;
use crate::packet::Packet;

/// What a socket may read and write while handling an event.
///
/// Sockets never route packets themselves: they push to `outbox`, and the
/// owner of the context routes everything once the call returns.
pub struct NetContext<'a> {
    pub(crate) tick: u64,
    pub(crate) local_net_id: Option<NetId>,
    pub(crate) rng: &'a mut dyn RngCore,
    pub(crate) outbox: &'a mut Vec<Packet>,
    pub(crate) timings: &'a SocketTimings,
}

impl<'a> NetContext<'a> {
    /// Creates a context.
    ///
    /// `local_net_id` is the net id of the owning computer's node interface;
    /// `None` means nothing can be sent.
    pub fn new(
        tick: u64,
        local_net_id: Option<NetId>,
        rng: &'a mut dyn RngCore,
        outbox: &'a mut Vec<Packet>,
        timings: &'a SocketTimings,
    ) -> Self {
        Self {
            tick,
            local_net_id,
            rng,
            outbox,
            timings,
        }
    }

    /// Current tick.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Net id packets are sent from.
    #[must_use]
    pub const fn local_net_id(&self) -> Option<NetId> {
        self.local_net_id
    }
}
