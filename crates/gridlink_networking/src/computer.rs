//! Computers and their operating systems.

use crate::ids::NodeId;
use crate::socket::SocketRegistry;

/// Software side of a computer.
#[derive(Debug, Default)]
pub struct OperatingSystem {
    net_module: SocketRegistry,
}

impl OperatingSystem {
    /// Creates an OS with a running network module.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            net_module: SocketRegistry::new(),
        }
    }

    /// The socket registry.
    #[must_use]
    pub const fn net_module(&self) -> &SocketRegistry {
        &self.net_module
    }

    /// The socket registry, mutably.
    pub fn net_module_mut(&mut self) -> &mut SocketRegistry {
        &mut self.net_module
    }
}

/// A networked machine: one node interface plus an OS.
#[derive(Debug)]
pub struct Computer {
    name: String,
    node: NodeId,
    os: OperatingSystem,
}

impl Computer {
    pub(crate) fn new(name: String, node: NodeId) -> Self {
        Self {
            name,
            node,
            os: OperatingSystem::new(),
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The computer's node interface.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Operating system.
    #[must_use]
    pub const fn os(&self) -> &OperatingSystem {
        &self.os
    }

    /// Operating system, mutably.
    pub fn os_mut(&mut self) -> &mut OperatingSystem {
        &mut self.os
    }
}
