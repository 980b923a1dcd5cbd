//! Endpoint interface of a computer.

use crate::address::NetId;
use crate::ids::{ComputerId, RouterId};

/// A computer's attachment point to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeNetInterface {
    owner: ComputerId,
    net_id: Option<NetId>,
    connection: Option<RouterId>,
}

impl NodeNetInterface {
    pub(crate) const fn new(owner: ComputerId) -> Self {
        Self {
            owner,
            net_id: None,
            connection: None,
        }
    }

    /// Computer receiving packets delivered here.
    #[must_use]
    pub const fn owner(&self) -> ComputerId {
        self.owner
    }

    /// Assigned net id, if any.
    #[must_use]
    pub const fn net_id(&self) -> Option<NetId> {
        self.net_id
    }

    /// Router this node hangs off, if any.
    #[must_use]
    pub const fn connection(&self) -> Option<RouterId> {
        self.connection
    }

    pub(crate) fn set_net_id(&mut self, net_id: Option<NetId>) {
        self.net_id = net_id;
    }

    pub(crate) fn set_connection(&mut self, connection: Option<RouterId>) {
        self.connection = connection;
    }
}
