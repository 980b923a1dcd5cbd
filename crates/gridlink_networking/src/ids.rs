//! # Entity Handles
//!
//! Typed wrappers over [`SlotId`] so a router handle can never be used to
//! look up a node.

use gridlink_core::SlotId;

macro_rules! slot_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(SlotId);

        impl $name {
            pub(crate) const fn from_slot(slot: SlotId) -> Self {
                Self(slot)
            }

            pub(crate) const fn slot(self) -> SlotId {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

slot_handle!(
    /// Handle to a computer in the world.
    ComputerId,
    "computer"
);
slot_handle!(
    /// Handle to a node network interface.
    NodeId,
    "node"
);
slot_handle!(
    /// Handle to a router network interface.
    RouterId,
    "router"
);
slot_handle!(
    /// Handle to a backbone.
    BackboneId,
    "backbone"
);

/// Identifier of a socket, unique within one registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SocketId(pub u64);

impl std::fmt::Display for SocketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "socket#{}", self.0)
    }
}
