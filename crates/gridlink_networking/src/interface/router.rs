//! Subnet router interface.

use crate::ids::{BackboneId, NodeId, RouterId};

/// A router serving one subnet.
///
/// Children are the nodes of its subnet; neighbours are peer routers it can
/// forward to directly. Both lists keep insertion order, which decides ties
/// during forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterNetInterface {
    subnet: u32,
    children: Vec<NodeId>,
    neighbours: Vec<RouterId>,
    backbone: Option<BackboneId>,
}

impl RouterNetInterface {
    pub(crate) const fn new(subnet: u32) -> Self {
        Self {
            subnet,
            children: Vec::new(),
            neighbours: Vec::new(),
            backbone: None,
        }
    }

    /// Subnet served.
    #[must_use]
    pub const fn subnet(&self) -> u32 {
        self.subnet
    }

    /// Attached nodes.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Linked peer routers.
    #[must_use]
    pub fn neighbours(&self) -> &[RouterId] {
        &self.neighbours
    }

    /// Attached backbone, if any.
    #[must_use]
    pub const fn backbone(&self) -> Option<BackboneId> {
        self.backbone
    }

    /// Returns true if `router` is a direct neighbour.
    #[must_use]
    pub fn is_linked_to(&self, router: RouterId) -> bool {
        self.neighbours.contains(&router)
    }

    pub(crate) fn add_child(&mut self, node: NodeId) {
        if !self.children.contains(&node) {
            self.children.push(node);
        }
    }

    pub(crate) fn remove_child(&mut self, node: NodeId) {
        self.children.retain(|&n| n != node);
    }

    pub(crate) fn add_neighbour(&mut self, router: RouterId) {
        if !self.neighbours.contains(&router) {
            self.neighbours.push(router);
        }
    }

    pub(crate) fn remove_neighbour(&mut self, router: RouterId) -> bool {
        let before = self.neighbours.len();
        self.neighbours.retain(|&r| r != router);
        self.neighbours.len() != before
    }

    pub(crate) fn set_backbone(&mut self, backbone: Option<BackboneId>) {
        self.backbone = backbone;
    }
}
