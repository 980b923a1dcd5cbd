//! Socket lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a socket.
///
/// ```text
/// INACTIVE --connect/SYN--> HANDSHAKE_SYN --ACK--> CONNECTED
///     |                          |                     |
///     |                          |              TEARDOWN received
///     |                          |                     v
///     |                          |             RECEIVED_TEARDOWN
///     v                          v                     v
///  DISCONNECTED <----------------+---------------------+
/// ```
///
/// `Disconnected` is terminal: the registry drops the socket as soon as it
/// gets there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketState {
    /// Created, no traffic yet.
    Inactive,
    /// Handshake in progress, either side.
    HandshakeSyn,
    /// Session established.
    Connected,
    /// Peer closed the session; about to disconnect.
    ReceivedTeardown,
    /// Closed.
    Disconnected,
}

impl SocketState {
    /// Returns true while a handshake or session is live.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::HandshakeSyn | Self::Connected)
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Inactive => "INACTIVE",
            Self::HandshakeSyn => "HANDSHAKE_SYN",
            Self::Connected => "CONNECTED",
            Self::ReceivedTeardown => "RECEIVED_TEARDOWN",
            Self::Disconnected => "DISCONNECTED",
        };
        f.write_str(text)
    }
}
