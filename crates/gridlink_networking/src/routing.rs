//! # Routing
//!
//! Hop-by-hop forwarding over the [`Topology`]. Routing is a pure decision:
//! it answers which node a packet ends up at, or why it was dropped, without
//! touching any socket state.
//!
//! ## Path Search
//!
//! When a router has no precomputed path it runs a depth-first search over
//! its neighbours with one visited set for the whole search, marking each
//! router before descending into it:
//!
//! 1. shortest path found to a router serving the destination subnet
//! 2. otherwise a path to any router attached to a backbone, followed by a
//!    backbone hop
//! 3. otherwise the packet is dropped
//!
//! With a shared visited set the first target is the fewest-hop path among
//! those the search reaches, which is not always the true shortest path.
//! Every packet carries a hop budget so a pathological topology can never
//! bounce a packet forever.

use std::collections::HashSet;
use std::fmt;

use crate::ids::{BackboneId, NodeId, RouterId};
use crate::interface::RouterNetInterface;
use crate::packet::{Hop, Packet, RoutedPacket};
use crate::topology::Topology;

/// Where a packet ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Reached a node interface.
    Delivered {
        /// Receiving node.
        node: NodeId,
        /// Router-to-router hand-offs taken on the way.
        forwards: u32,
    },
    /// Silently discarded.
    Dropped(DropReason),
}

impl Delivery {
    /// Receiving node, if the packet was delivered.
    #[must_use]
    pub const fn node(&self) -> Option<NodeId> {
        match self {
            Self::Delivered { node, .. } => Some(*node),
            Self::Dropped(_) => None,
        }
    }

    /// Returns true if the packet was dropped.
    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped(_))
    }
}

/// Why a packet was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// A handle on the path no longer resolves.
    UnknownInterface,
    /// The sending node has no router.
    Unconnected,
    /// Neither the destination subnet nor a backbone is reachable.
    NoRoute,
    /// The destination router has no node with that net id.
    NoMatchingChild,
    /// No router on the backbone serves the destination subnet.
    BackboneMiss,
    /// Hop budget exhausted.
    HopLimit,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnknownInterface => "unknown interface",
            Self::Unconnected => "sender not connected",
            Self::NoRoute => "no route",
            Self::NoMatchingChild => "no matching child",
            Self::BackboneMiss => "backbone miss",
            Self::HopLimit => "hop limit",
        };
        f.write_str(text)
    }
}

impl Topology {
    /// Routes a packet emitted by `node`.
    ///
    /// A packet addressed to the node's own net id is delivered locally;
    /// anything else goes to its router.
    #[must_use]
    pub fn process_from_node(&self, node: NodeId, packet: &Packet) -> Delivery {
        let Some(interface) = self.node(node) else {
            return Delivery::Dropped(DropReason::UnknownInterface);
        };
        if interface.net_id() == Some(packet.destination().net_id()) {
            return Delivery::Delivered { node, forwards: 0 };
        }
        match interface.connection() {
            Some(router) => self.process_from_router(router, packet),
            None => Delivery::Dropped(DropReason::Unconnected),
        }
    }

    /// Routes a packet arriving at `router` with no precomputed path.
    #[must_use]
    pub fn process_from_router(&self, router: RouterId, packet: &Packet) -> Delivery {
        self.process_routed(router, RoutedPacket::new(packet))
    }

    /// Advances a routed packet one step from `router`.
    #[must_use]
    pub fn process_routed(&self, router: RouterId, mut routed: RoutedPacket<'_>) -> Delivery {
        let Some(interface) = self.router(router) else {
            return Delivery::Dropped(DropReason::UnknownInterface);
        };

        match routed.next_hop() {
            None => match self.matching_child(interface, routed.packet()) {
                Some(node) => Delivery::Delivered {
                    node,
                    forwards: routed.forwards(),
                },
                None => self.route_packet(router, routed),
            },
            Some(Hop::Backbone) => match interface.backbone() {
                Some(backbone) => self.process_backbone(backbone, routed),
                None => self.route_packet(router, routed),
            },
            Some(Hop::Subnet(subnet)) => {
                let next = interface
                    .neighbours()
                    .iter()
                    .copied()
                    .find(|&n| self.router(n).is_some_and(|r| r.subnet() == subnet));
                match next {
                    Some(next) => self.forward(next, routed),
                    None => self.route_packet(router, routed),
                }
            }
        }
    }

    /// Computes a fresh path from `router` and follows it.
    fn route_packet(&self, router: RouterId, mut routed: RoutedPacket<'_>) -> Delivery {
        let subnet = routed.packet().destination().net_id().subnet();

        let direct = self
            .find_path(router, |r| r.subnet() == subnet)
            .map(|path| self.to_hops(&path));
        let path = direct.or_else(|| {
            self.find_path(router, |r| r.backbone().is_some())
                .map(|path| {
                    let mut hops = self.to_hops(&path);
                    hops.push(Hop::Backbone);
                    hops
                })
        });

        match path {
            // Already at the destination router and nobody matched
            Some(path) if path.is_empty() => Delivery::Dropped(DropReason::NoMatchingChild),
            Some(path) => {
                routed.replace_path(path);
                self.process_routed(router, routed)
            }
            None => Delivery::Dropped(DropReason::NoRoute),
        }
    }

    fn process_backbone(&self, backbone: BackboneId, mut routed: RoutedPacket<'_>) -> Delivery {
        let Some(b) = self.backbone(backbone) else {
            return Delivery::Dropped(DropReason::UnknownInterface);
        };
        let subnet = routed.packet().destination().net_id().subnet();
        let target = b
            .routers()
            .iter()
            .copied()
            .find(|&r| self.router(r).is_some_and(|r| r.subnet() == subnet));

        match target {
            Some(target) => {
                routed.clear_path();
                self.forward(target, routed)
            }
            None => Delivery::Dropped(DropReason::BackboneMiss),
        }
    }

    fn forward(&self, next: RouterId, mut routed: RoutedPacket<'_>) -> Delivery {
        if routed.forwarded() > self.max_hops {
            return Delivery::Dropped(DropReason::HopLimit);
        }
        self.process_routed(next, routed)
    }

    fn matching_child(&self, router: &RouterNetInterface, packet: &Packet) -> Option<NodeId> {
        let destination = packet.destination().net_id();
        router
            .children()
            .iter()
            .copied()
            .find(|&n| self.node(n).and_then(|n| n.net_id()) == Some(destination))
    }

    fn to_hops(&self, path: &[RouterId]) -> Vec<Hop> {
        path.iter()
            .filter_map(|&r| self.router(r).map(|r| Hop::Subnet(r.subnet())))
            .collect()
    }

    /// Depth-first search from `start` for a router satisfying `is_goal`.
    ///
    /// Returns the routers after `start`, so an empty path means `start`
    /// itself is a goal.
    fn find_path(
        &self,
        start: RouterId,
        is_goal: impl Fn(&RouterNetInterface) -> bool,
    ) -> Option<Vec<RouterId>> {
        let mut visited = HashSet::new();
        let mut trail = Vec::new();
        let mut best = None;
        self.search(start, &is_goal, &mut visited, &mut trail, &mut best);
        best
    }

    fn search(
        &self,
        router: RouterId,
        is_goal: &dyn Fn(&RouterNetInterface) -> bool,
        visited: &mut HashSet<RouterId>,
        trail: &mut Vec<RouterId>,
        best: &mut Option<Vec<RouterId>>,
    ) {
        let Some(interface) = self.router(router) else {
            return;
        };
        visited.insert(router);

        if is_goal(interface) {
            let shorter = match best {
                Some(found) => trail.len() < found.len(),
                None => true,
            };
            if shorter {
                *best = Some(trail.clone());
            }
            return;
        }

        for &next in interface.neighbours() {
            if visited.contains(&next) {
                continue;
            }
            trail.push(next);
            self.search(next, is_goal, visited, trail, best);
            trail.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, NetId};
    use crate::ids::ComputerId;
    use gridlink_core::SlotId;

    fn packet_to(net_id: NetId) -> Packet {
        let source = Address::new(NetId::new(0, 0), 1).unwrap();
        Packet::data(source, Address::new(net_id, 80).unwrap(), "x")
    }

    fn host(topo: &mut Topology, router: RouterId, id: u32) -> NodeId {
        let subnet = topo.router(router).unwrap().subnet();
        let node = topo.add_node(ComputerId::from_slot(SlotId::new(id, 0)));
        topo.connect_node(node, router).unwrap();
        topo.set_net_id(node, Some(NetId::new(subnet, id))).unwrap();
        node
    }

    #[test]
    fn test_local_delivery_skips_router() {
        let mut topo = Topology::default();
        let router = topo.add_router(1);
        let node = host(&mut topo, router, 1);

        let delivery = topo.process_from_node(node, &packet_to(NetId::new(1, 1)));
        assert_eq!(delivery, Delivery::Delivered { node, forwards: 0 });
    }

    #[test]
    fn test_sibling_delivery() {
        let mut topo = Topology::default();
        let router = topo.add_router(1);
        let a = host(&mut topo, router, 1);
        let b = host(&mut topo, router, 2);

        let delivery = topo.process_from_node(a, &packet_to(NetId::new(1, 2)));
        assert_eq!(delivery.node(), Some(b));
    }

    #[test]
    fn test_unconnected_sender_drops() {
        let mut topo = Topology::default();
        let node = topo.add_node(ComputerId::from_slot(SlotId::new(0, 0)));
        let delivery = topo.process_from_node(node, &packet_to(NetId::new(1, 2)));
        assert_eq!(delivery, Delivery::Dropped(DropReason::Unconnected));
    }

    #[test]
    fn test_unknown_host_in_own_subnet_drops() {
        let mut topo = Topology::default();
        let router = topo.add_router(1);
        host(&mut topo, router, 1);

        let delivery = topo.process_from_router(router, &packet_to(NetId::new(1, 9)));
        assert_eq!(delivery, Delivery::Dropped(DropReason::NoMatchingChild));
    }

    #[test]
    fn test_search_prefers_fewer_hops() {
        // r1 - r2 - r3 - r4(5)  and  r1 - r5(5): both reach subnet 5
        let mut topo = Topology::default();
        let r1 = topo.add_router(1);
        let r2 = topo.add_router(2);
        let r3 = topo.add_router(3);
        let r4 = topo.add_router(5);
        let r5 = topo.add_router(5);
        topo.link_routers(r1, r2).unwrap();
        topo.link_routers(r2, r3).unwrap();
        topo.link_routers(r3, r4).unwrap();
        topo.link_routers(r1, r5).unwrap();

        let path = topo.find_path(r1, |r| r.subnet() == 5).unwrap();
        assert_eq!(path, vec![r5]);
    }

    #[test]
    fn test_backbone_fallback() {
        let mut topo = Topology::default();
        let r1 = topo.add_router(1);
        let gateway = topo.add_router(2);
        let remote = topo.add_router(7);
        let backbone = topo.add_backbone();
        topo.link_routers(r1, gateway).unwrap();
        topo.attach_backbone(gateway, backbone).unwrap();
        topo.attach_backbone(remote, backbone).unwrap();
        let target = host(&mut topo, remote, 3);

        let delivery = topo.process_from_router(r1, &packet_to(NetId::new(7, 3)));
        assert_eq!(
            delivery,
            Delivery::Delivered {
                node: target,
                forwards: 2
            }
        );
    }

    #[test]
    fn test_backbone_without_destination_subnet_drops() {
        let mut topo = Topology::default();
        let r1 = topo.add_router(1);
        let backbone = topo.add_backbone();
        topo.attach_backbone(r1, backbone).unwrap();

        let delivery = topo.process_from_router(r1, &packet_to(NetId::new(9, 1)));
        assert_eq!(delivery, Delivery::Dropped(DropReason::BackboneMiss));
    }

    #[test]
    fn test_isolated_router_drops() {
        let mut topo = Topology::default();
        let r1 = topo.add_router(1);
        let delivery = topo.process_from_router(r1, &packet_to(NetId::new(9, 1)));
        assert_eq!(delivery, Delivery::Dropped(DropReason::NoRoute));
    }

    #[test]
    fn test_hop_budget() {
        let mut topo = Topology::new(2);
        let routers: Vec<_> = (1..=5).map(|s| topo.add_router(s)).collect();
        for pair in routers.windows(2) {
            topo.link_routers(pair[0], pair[1]).unwrap();
        }
        host(&mut topo, routers[4], 1);

        let delivery = topo.process_from_router(routers[0], &packet_to(NetId::new(5, 1)));
        assert_eq!(delivery, Delivery::Dropped(DropReason::HopLimit));

        topo.max_hops = 4;
        let delivery = topo.process_from_router(routers[0], &packet_to(NetId::new(5, 1)));
        assert!(!delivery.is_dropped());
    }
}
