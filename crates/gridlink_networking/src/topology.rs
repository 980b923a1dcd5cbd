//! # Topology
//!
//! Owns every node, router and backbone in generational slabs and exposes the
//! only operations that change links. Each one updates both ends at once:
//!
//! - a node's `connection` is `R` exactly when `R` lists it as a child
//! - router neighbourship is symmetric
//! - a router's `backbone` is `B` exactly when `B` lists the router
//!
//! Removing an entity first unlinks it from everything it touches, so no
//! handle in the topology ever dangles.

use gridlink_core::Slab;

use crate::address::NetId;
use crate::error::{NetworkError, NetworkResult};
use crate::ids::{BackboneId, ComputerId, NodeId, RouterId};
use crate::interface::{Backbone, NodeNetInterface, RouterNetInterface};

/// The link graph of the network.
#[derive(Debug, Clone)]
pub struct Topology {
    pub(crate) nodes: Slab<NodeNetInterface>,
    pub(crate) routers: Slab<RouterNetInterface>,
    pub(crate) backbones: Slab<Backbone>,
    pub(crate) max_hops: u32,
}

impl Topology {
    /// Creates an empty topology. Packets are dropped once they have been
    /// forwarded between routers more than `max_hops` times.
    #[must_use]
    pub const fn new(max_hops: u32) -> Self {
        Self {
            nodes: Slab::new(),
            routers: Slab::new(),
            backbones: Slab::new(),
            max_hops,
        }
    }

    // =========================================================================
    // Entities
    // =========================================================================

    pub(crate) fn add_node(&mut self, owner: ComputerId) -> NodeId {
        NodeId::from_slot(self.nodes.insert(NodeNetInterface::new(owner)))
    }

    /// Disconnects and removes a node.
    pub(crate) fn remove_node(&mut self, node: NodeId) -> NetworkResult<NodeNetInterface> {
        self.disconnect_node(node)?;
        self.nodes
            .remove(node.slot())
            .ok_or(NetworkError::UnknownNode(node))
    }

    /// Adds a router serving `subnet`.
    pub fn add_router(&mut self, subnet: u32) -> RouterId {
        let id = RouterId::from_slot(self.routers.insert(RouterNetInterface::new(subnet)));
        tracing::debug!(router = %id, subnet, "router added");
        id
    }

    /// Removes a router after detaching its children, neighbours and backbone.
    ///
    /// Orphaned children lose their net id, since it belonged to this
    /// router's subnet.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRouter` for a stale handle.
    pub fn remove_router(&mut self, router: RouterId) -> NetworkResult<RouterNetInterface> {
        let snapshot = self.router_ref(router)?.clone();
        for &child in snapshot.children() {
            if let Some(node) = self.nodes.get_mut(child.slot()) {
                node.set_connection(None);
                node.set_net_id(None);
            }
        }
        for &neighbour in snapshot.neighbours() {
            if let Some(peer) = self.routers.get_mut(neighbour.slot()) {
                peer.remove_neighbour(router);
            }
        }
        if let Some(backbone) = snapshot.backbone() {
            if let Some(b) = self.backbones.get_mut(backbone.slot()) {
                b.remove_router(router);
            }
        }
        tracing::debug!(%router, "router removed");
        self.routers
            .remove(router.slot())
            .ok_or(NetworkError::UnknownRouter(router))
    }

    /// Adds an empty backbone.
    pub fn add_backbone(&mut self) -> BackboneId {
        BackboneId::from_slot(self.backbones.insert(Backbone::new()))
    }

    /// Removes a backbone, detaching every router from it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownBackbone` for a stale handle.
    pub fn remove_backbone(&mut self, backbone: BackboneId) -> NetworkResult<Backbone> {
        let removed = self
            .backbones
            .remove(backbone.slot())
            .ok_or(NetworkError::UnknownBackbone(backbone))?;
        for &router in removed.routers() {
            if let Some(r) = self.routers.get_mut(router.slot()) {
                r.set_backbone(None);
            }
        }
        Ok(removed)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Looks up a node.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&NodeNetInterface> {
        self.nodes.get(node.slot())
    }

    /// Looks up a router.
    #[must_use]
    pub fn router(&self, router: RouterId) -> Option<&RouterNetInterface> {
        self.routers.get(router.slot())
    }

    /// Looks up a backbone.
    #[must_use]
    pub fn backbone(&self, backbone: BackboneId) -> Option<&Backbone> {
        self.backbones.get(backbone.slot())
    }

    /// Iterates over nodes.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeNetInterface)> {
        self.nodes.iter().map(|(id, n)| (NodeId::from_slot(id), n))
    }

    /// Iterates over routers.
    pub fn routers(&self) -> impl Iterator<Item = (RouterId, &RouterNetInterface)> {
        self.routers.iter().map(|(id, r)| (RouterId::from_slot(id), r))
    }

    /// Iterates over backbones.
    pub fn backbones(&self) -> impl Iterator<Item = (BackboneId, &Backbone)> {
        self.backbones
            .iter()
            .map(|(id, b)| (BackboneId::from_slot(id), b))
    }

    /// Finds the node currently holding `net_id`.
    #[must_use]
    pub fn node_by_net_id(&self, net_id: NetId) -> Option<NodeId> {
        self.nodes()
            .find(|(_, n)| n.net_id() == Some(net_id))
            .map(|(id, _)| id)
    }

    /// Hop budget per packet.
    #[must_use]
    pub const fn max_hops(&self) -> u32 {
        self.max_hops
    }

    fn node_ref(&self, node: NodeId) -> NetworkResult<&NodeNetInterface> {
        self.node(node).ok_or(NetworkError::UnknownNode(node))
    }

    fn router_ref(&self, router: RouterId) -> NetworkResult<&RouterNetInterface> {
        self.router(router).ok_or(NetworkError::UnknownRouter(router))
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Attaches a node to a router, moving it off any previous router.
    ///
    /// Any change of router clears the node's net id. Reconnecting to the
    /// current router is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` or `UnknownRouter` for stale handles.
    pub fn connect_node(&mut self, node: NodeId, router: RouterId) -> NetworkResult<()> {
        self.router_ref(router)?;
        let previous = self.node_ref(node)?.connection();
        if previous == Some(router) {
            return Ok(());
        }
        if previous.is_some() {
            self.disconnect_node(node)?;
        }

        if let Some(r) = self.routers.get_mut(router.slot()) {
            r.add_child(node);
        }
        if let Some(n) = self.nodes.get_mut(node.slot()) {
            n.set_connection(Some(router));
            n.set_net_id(None);
        }
        tracing::debug!(%node, %router, "node connected");
        Ok(())
    }

    /// Detaches a node from its router and clears its net id. No-op if it
    /// has no router.
    ///
    /// # Errors
    ///
    /// Returns `UnknownNode` for a stale handle.
    pub fn disconnect_node(&mut self, node: NodeId) -> NetworkResult<()> {
        let Some(router) = self.node_ref(node)?.connection() else {
            return Ok(());
        };
        if let Some(r) = self.routers.get_mut(router.slot()) {
            r.remove_child(node);
        }
        if let Some(n) = self.nodes.get_mut(node.slot()) {
            n.set_connection(None);
            n.set_net_id(None);
        }
        tracing::debug!(%node, %router, "node disconnected");
        Ok(())
    }

    /// Assigns or clears a node's net id.
    ///
    /// # Errors
    ///
    /// - `UnknownNode` for a stale handle
    /// - `SubnetMismatch` if the node is connected to a router of another subnet
    /// - `NetIdInUse` if another node holds `net_id`
    pub fn set_net_id(&mut self, node: NodeId, net_id: Option<NetId>) -> NetworkResult<()> {
        let connection = self.node_ref(node)?.connection();
        if let (Some(net_id), Some(router)) = (net_id, connection) {
            let router_subnet = self.router_ref(router)?.subnet();
            if net_id.subnet() != router_subnet {
                return Err(NetworkError::SubnetMismatch {
                    net_id,
                    router_subnet,
                });
            }
        }
        if let Some(net_id) = net_id {
            if self.node_by_net_id(net_id).is_some_and(|holder| holder != node) {
                return Err(NetworkError::NetIdInUse(net_id));
            }
        }
        if let Some(n) = self.nodes.get_mut(node.slot()) {
            n.set_net_id(net_id);
        }
        Ok(())
    }

    /// Links two routers as neighbours.
    ///
    /// # Errors
    ///
    /// - `UnknownRouter` for stale handles
    /// - `SelfLink` if both handles are the same router
    pub fn link_routers(&mut self, a: RouterId, b: RouterId) -> NetworkResult<()> {
        if a == b {
            return Err(NetworkError::SelfLink(a));
        }
        self.router_ref(a)?;
        self.router_ref(b)?;
        if let Some(r) = self.routers.get_mut(a.slot()) {
            r.add_neighbour(b);
        }
        if let Some(r) = self.routers.get_mut(b.slot()) {
            r.add_neighbour(a);
        }
        tracing::debug!(%a, %b, "routers linked");
        Ok(())
    }

    /// Removes the link between two routers. Returns false if there was none.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRouter` for stale handles.
    pub fn unlink_routers(&mut self, a: RouterId, b: RouterId) -> NetworkResult<bool> {
        self.router_ref(a)?;
        self.router_ref(b)?;
        let mut removed = false;
        if let Some(r) = self.routers.get_mut(a.slot()) {
            removed |= r.remove_neighbour(b);
        }
        if let Some(r) = self.routers.get_mut(b.slot()) {
            removed |= r.remove_neighbour(a);
        }
        if removed {
            tracing::debug!(%a, %b, "routers unlinked");
        }
        Ok(removed)
    }

    /// Attaches a router to a backbone, leaving any previous backbone.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRouter` or `UnknownBackbone` for stale handles.
    pub fn attach_backbone(&mut self, router: RouterId, backbone: BackboneId) -> NetworkResult<()> {
        if self.backbone(backbone).is_none() {
            return Err(NetworkError::UnknownBackbone(backbone));
        }
        if self.router_ref(router)?.backbone() == Some(backbone) {
            return Ok(());
        }
        self.detach_backbone(router)?;

        if let Some(b) = self.backbones.get_mut(backbone.slot()) {
            b.add_router(router);
        }
        if let Some(r) = self.routers.get_mut(router.slot()) {
            r.set_backbone(Some(backbone));
        }
        tracing::debug!(%router, %backbone, "backbone attached");
        Ok(())
    }

    /// Detaches a router from its backbone, returning the old backbone.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRouter` for a stale handle.
    pub fn detach_backbone(&mut self, router: RouterId) -> NetworkResult<Option<BackboneId>> {
        let Some(backbone) = self.router_ref(router)?.backbone() else {
            return Ok(None);
        };
        if let Some(b) = self.backbones.get_mut(backbone.slot()) {
            b.remove_router(router);
        }
        if let Some(r) = self.routers.get_mut(router.slot()) {
            r.set_backbone(None);
        }
        Ok(Some(backbone))
    }

    /// Lists every broken link invariant. Empty when the topology is sound.
    #[must_use]
    pub fn link_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (id, node) in self.nodes() {
            if let Some(router) = node.connection() {
                match self.router(router) {
                    Some(r) if r.children().contains(&id) => {
                        if let Some(net_id) = node.net_id() {
                            if net_id.subnet() != r.subnet() {
                                violations.push(format!("{id} holds {net_id} outside subnet {}", r.subnet()));
                            }
                        }
                    }
                    Some(_) => violations.push(format!("{router} does not list child {id}")),
                    None => violations.push(format!("{id} points at missing {router}")),
                }
            }
        }

        for (id, router) in self.routers() {
            for &child in router.children() {
                if self.node(child).and_then(NodeNetInterface::connection) != Some(id) {
                    violations.push(format!("{id} lists {child} which points elsewhere"));
                }
            }
            for &neighbour in router.neighbours() {
                if !self.router(neighbour).is_some_and(|n| n.is_linked_to(id)) {
                    violations.push(format!("{id} -> {neighbour} link is one-sided"));
                }
            }
            if let Some(backbone) = router.backbone() {
                if !self.backbone(backbone).is_some_and(|b| b.routers().contains(&id)) {
                    violations.push(format!("{backbone} does not list {id}"));
                }
            }
        }

        for (id, backbone) in self.backbones() {
            for &router in backbone.routers() {
                if self.router(router).and_then(RouterNetInterface::backbone) != Some(id) {
                    violations.push(format!("{id} lists {router} which points elsewhere"));
                }
            }
        }

        violations
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_HOPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlink_core::SlotId;

    fn owner(n: u32) -> ComputerId {
        ComputerId::from_slot(SlotId::new(n, 0))
    }

    #[test]
    fn test_connect_updates_both_sides() {
        let mut topo = Topology::default();
        let router = topo.add_router(10);
        let node = topo.add_node(owner(0));

        topo.connect_node(node, router).unwrap();
        assert_eq!(topo.node(node).unwrap().connection(), Some(router));
        assert_eq!(topo.router(router).unwrap().children(), &[node]);

        topo.disconnect_node(node).unwrap();
        assert_eq!(topo.node(node).unwrap().connection(), None);
        assert!(topo.router(router).unwrap().children().is_empty());
        assert!(topo.link_violations().is_empty());
    }

    #[test]
    fn test_disconnect_releases_net_id() {
        let mut topo = Topology::default();
        let router = topo.add_router(10);
        let node = topo.add_node(owner(0));
        let other = topo.add_node(owner(1));

        topo.connect_node(node, router).unwrap();
        topo.set_net_id(node, Some(NetId::new(10, 1))).unwrap();
        topo.disconnect_node(node).unwrap();

        assert_eq!(topo.node(node).unwrap().net_id(), None);
        assert_eq!(topo.node_by_net_id(NetId::new(10, 1)), None);
        // The released address can be handed out again
        topo.connect_node(other, router).unwrap();
        topo.set_net_id(other, Some(NetId::new(10, 1))).unwrap();
    }

    #[test]
    fn test_move_within_subnet_clears_net_id() {
        let mut topo = Topology::default();
        let r1 = topo.add_router(10);
        let r2 = topo.add_router(10);
        let node = topo.add_node(owner(0));

        topo.connect_node(node, r1).unwrap();
        topo.set_net_id(node, Some(NetId::new(10, 1))).unwrap();

        // Same router keeps the address
        topo.connect_node(node, r1).unwrap();
        assert_eq!(topo.node(node).unwrap().net_id(), Some(NetId::new(10, 1)));

        topo.connect_node(node, r2).unwrap();
        assert_eq!(topo.node(node).unwrap().connection(), Some(r2));
        assert_eq!(topo.node(node).unwrap().net_id(), None);
        assert!(topo.link_violations().is_empty());
    }

    #[test]
    fn test_reconnect_moves_child() {
        let mut topo = Topology::default();
        let r1 = topo.add_router(10);
        let r2 = topo.add_router(20);
        let node = topo.add_node(owner(0));

        topo.connect_node(node, r1).unwrap();
        topo.set_net_id(node, Some(NetId::new(10, 1))).unwrap();
        topo.connect_node(node, r2).unwrap();

        assert!(topo.router(r1).unwrap().children().is_empty());
        assert_eq!(topo.router(r2).unwrap().children(), &[node]);
        // Old subnet address does not survive the move
        assert_eq!(topo.node(node).unwrap().net_id(), None);
        assert!(topo.link_violations().is_empty());
    }

    #[test]
    fn test_net_id_must_match_router_subnet() {
        let mut topo = Topology::default();
        let router = topo.add_router(10);
        let node = topo.add_node(owner(0));
        topo.connect_node(node, router).unwrap();

        let err = topo.set_net_id(node, Some(NetId::new(11, 1))).unwrap_err();
        assert!(matches!(err, NetworkError::SubnetMismatch { router_subnet: 10, .. }));
        topo.set_net_id(node, Some(NetId::new(10, 1))).unwrap();
        assert_eq!(topo.node_by_net_id(NetId::new(10, 1)), Some(node));

        let other = topo.add_node(owner(1));
        topo.connect_node(other, router).unwrap();
        assert_eq!(
            topo.set_net_id(other, Some(NetId::new(10, 1))),
            Err(NetworkError::NetIdInUse(NetId::new(10, 1)))
        );
        // Reassigning the holder its own id is fine
        topo.set_net_id(node, Some(NetId::new(10, 1))).unwrap();
    }

    #[test]
    fn test_links_are_symmetric() {
        let mut topo = Topology::default();
        let a = topo.add_router(1);
        let b = topo.add_router(2);

        topo.link_routers(a, b).unwrap();
        topo.link_routers(b, a).unwrap();
        assert_eq!(topo.router(a).unwrap().neighbours(), &[b]);
        assert_eq!(topo.router(b).unwrap().neighbours(), &[a]);

        assert!(topo.unlink_routers(b, a).unwrap());
        assert!(!topo.unlink_routers(a, b).unwrap());
        assert!(topo.router(a).unwrap().neighbours().is_empty());
        assert_eq!(topo.link_routers(a, a), Err(NetworkError::SelfLink(a)));
    }

    #[test]
    fn test_backbone_attach_is_exclusive() {
        let mut topo = Topology::default();
        let router = topo.add_router(1);
        let b1 = topo.add_backbone();
        let b2 = topo.add_backbone();

        topo.attach_backbone(router, b1).unwrap();
        topo.attach_backbone(router, b2).unwrap();

        assert!(topo.backbone(b1).unwrap().routers().is_empty());
        assert_eq!(topo.backbone(b2).unwrap().routers(), &[router]);
        assert_eq!(topo.detach_backbone(router).unwrap(), Some(b2));
        assert!(topo.link_violations().is_empty());
    }

    #[test]
    fn test_remove_router_unlinks_everything() {
        let mut topo = Topology::default();
        let a = topo.add_router(1);
        let b = topo.add_router(2);
        let backbone = topo.add_backbone();
        let node = topo.add_node(owner(0));

        topo.link_routers(a, b).unwrap();
        topo.attach_backbone(a, backbone).unwrap();
        topo.connect_node(node, a).unwrap();
        topo.set_net_id(node, Some(NetId::new(1, 1))).unwrap();

        topo.remove_router(a).unwrap();

        assert!(topo.router(a).is_none());
        assert!(topo.router(b).unwrap().neighbours().is_empty());
        assert!(topo.backbone(backbone).unwrap().routers().is_empty());
        assert_eq!(topo.node(node).unwrap().connection(), None);
        assert_eq!(topo.node(node).unwrap().net_id(), None);
        assert!(topo.link_violations().is_empty());

        // Stale handle
        assert_eq!(topo.remove_router(a).unwrap_err(), NetworkError::UnknownRouter(a));
    }

    #[test]
    fn test_remove_backbone_clears_routers() {
        let mut topo = Topology::default();
        let router = topo.add_router(1);
        let backbone = topo.add_backbone();
        topo.attach_backbone(router, backbone).unwrap();

        topo.remove_backbone(backbone).unwrap();
        assert_eq!(topo.router(router).unwrap().backbone(), None);
        assert!(topo.link_violations().is_empty());
    }
}
