//! Integration tests for router forwarding and link bookkeeping.

use gridlink_networking::{
    Address, ComputerId, Delivery, DropReason, NetId, NetworkConfig, NetworkWorld, Packet,
    RouterId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn packet_to(net_id: NetId) -> Packet {
    let source = Address::new(NetId::new(99, 1), 40000).unwrap();
    Packet::data(source, Address::new(net_id, 80).unwrap(), "hello")
}

/// R1(10) - R2(20) - R3(30), one host on R3.
fn chain() -> (NetworkWorld, [RouterId; 3], ComputerId) {
    let mut world = NetworkWorld::default();
    let r1 = world.add_router(10);
    let r2 = world.add_router(20);
    let r3 = world.add_router(30);
    world.topology_mut().link_routers(r1, r2).unwrap();
    world.topology_mut().link_routers(r2, r3).unwrap();

    let host = world.add_computer("host");
    world.attach_computer(host, r3, 5).unwrap();
    (world, [r1, r2, r3], host)
}

#[test]
fn test_chain_delivery_within_two_hops() {
    let (mut world, [r1, ..], host) = chain();
    let node = world.node_of(host).unwrap();

    let delivery = world.inject_at_router(r1, packet_to(NetId::new(30, 5)));

    assert_eq!(delivery, Delivery::Delivered { node, forwards: 2 });
    assert_eq!(world.stats().packets_delivered, 1);
}

#[test]
fn test_unlinked_chain_drops() {
    let (mut world, [r1, r2, _], _) = chain();
    world.topology_mut().unlink_routers(r1, r2).unwrap();

    let delivery = world.inject_at_router(r1, packet_to(NetId::new(30, 5)));

    assert_eq!(delivery, Delivery::Dropped(DropReason::NoRoute));
    assert_eq!(world.stats().packets_dropped, 1);
}

#[test]
fn test_removed_router_breaks_path() {
    let (mut world, [r1, r2, _], host) = chain();
    world.topology_mut().remove_router(r2).unwrap();

    assert!(world
        .inject_at_router(r1, packet_to(NetId::new(30, 5)))
        .is_dropped());
    // The host itself is untouched
    assert_eq!(
        world.net_id_of(host).unwrap(),
        Some(NetId::new(30, 5))
    );
}

/// Ring R1(1) - R2(2) - R3(3) - R4(4) - R5(5) - R1 with a chord R2 - R4,
/// one host on R4.
fn ring() -> (NetworkWorld, [RouterId; 5], ComputerId) {
    let mut world = NetworkWorld::default();
    let r: Vec<_> = (1..=5).map(|subnet| world.add_router(subnet)).collect();
    for i in 0..5 {
        world.topology_mut().link_routers(r[i], r[(i + 1) % 5]).unwrap();
    }
    world.topology_mut().link_routers(r[1], r[3]).unwrap();

    let host = world.add_computer("host");
    world.attach_computer(host, r[3], 7).unwrap();
    (world, [r[0], r[1], r[2], r[3], r[4]], host)
}

#[test]
fn test_ring_with_chord_follows_search_order() {
    let (mut world, [r1, _, r3, r4, _], host) = ring();
    let node = world.node_of(host).unwrap();

    // R3 is reached before the chord, which is then already visited
    let delivery = world.inject_at_router(r1, packet_to(NetId::new(4, 7)));
    assert_eq!(delivery, Delivery::Delivered { node, forwards: 3 });

    world.topology_mut().unlink_routers(r3, r4).unwrap();
    let delivery = world.inject_at_router(r1, packet_to(NetId::new(4, 7)));
    assert_eq!(delivery, Delivery::Delivered { node, forwards: 2 });
}

#[test]
fn test_ring_unknown_subnet_drops() {
    let (mut world, [r1, ..], _) = ring();

    let delivery = world.inject_at_router(r1, packet_to(NetId::new(77, 1)));

    assert_eq!(delivery, Delivery::Dropped(DropReason::NoRoute));
    assert_eq!(world.stats().packets_dropped, 1);
    assert_eq!(world.stats().packets_delivered, 0);
}

#[test]
fn test_backbone_joins_islands() {
    let mut world = NetworkWorld::default();
    let west = world.add_router(1);
    let west_gw = world.add_router(2);
    let east_gw = world.add_router(3);
    let east = world.add_router(4);
    let backbone = world.add_backbone();
    world.topology_mut().link_routers(west, west_gw).unwrap();
    world.topology_mut().link_routers(east_gw, east).unwrap();
    world.topology_mut().attach_backbone(west_gw, backbone).unwrap();
    world.topology_mut().attach_backbone(east_gw, backbone).unwrap();

    let east_host = world.add_computer("east");
    world.attach_computer(east_host, east, 1).unwrap();
    let west_host = world.add_computer("west");
    world.attach_computer(west_host, west, 1).unwrap();

    // Subnet 3 is on the backbone, so the east gateway's own subnet is reachable
    let to_gateway_subnet = world.inject_at_router(west, packet_to(NetId::new(3, 1)));
    assert_eq!(to_gateway_subnet, Delivery::Dropped(DropReason::NoMatchingChild));

    // Subnet 4 sits behind the east gateway and no backbone router serves it
    let behind_gateway = world.inject_at_router(west, packet_to(NetId::new(4, 1)));
    assert_eq!(behind_gateway, Delivery::Dropped(DropReason::BackboneMiss));

    world.topology_mut().attach_backbone(east, backbone).unwrap();
    let node = world.node_of(east_host).unwrap();
    assert_eq!(
        world
            .inject_at_router(west, packet_to(NetId::new(4, 1)))
            .node(),
        Some(node)
    );
}

#[test]
fn test_same_subnet_neighbour_is_used() {
    let mut world = NetworkWorld::default();
    let a = world.add_router(1);
    let b = world.add_router(2);
    world.topology_mut().link_routers(a, b).unwrap();
    let pc = world.add_computer("pc");
    world.attach_computer(pc, b, 9).unwrap();

    let delivery = world.inject_at_router(a, packet_to(NetId::new(2, 9)));
    assert_eq!(
        delivery,
        Delivery::Delivered {
            node: world.node_of(pc).unwrap(),
            forwards: 1
        }
    );
}

#[test]
fn test_hop_budget_from_config() {
    let mut config = NetworkConfig::default();
    config.routing.max_hops = 3;
    let mut world = NetworkWorld::new(config);
    let routers: Vec<_> = (1..=6).map(|subnet| world.add_router(subnet)).collect();
    for pair in routers.windows(2) {
        world.topology_mut().link_routers(pair[0], pair[1]).unwrap();
    }
    let far = world.add_computer("far");
    world.attach_computer(far, routers[5], 1).unwrap();

    let delivery = world.inject_at_router(routers[0], packet_to(NetId::new(6, 1)));
    assert_eq!(delivery, Delivery::Dropped(DropReason::HopLimit));
}

#[test]
fn test_random_link_churn_keeps_links_consistent() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let mut world = NetworkWorld::default();
    let routers: Vec<_> = (0..8).map(|subnet| world.add_router(subnet)).collect();
    let backbones: Vec<_> = (0..2).map(|_| world.add_backbone()).collect();
    let computers: Vec<_> = (0..12)
        .map(|i| world.add_computer(format!("pc-{i}")))
        .collect();

    for step in 0..2000 {
        let a = routers[rng.gen_range(0..routers.len())];
        let b = routers[rng.gen_range(0..routers.len())];
        let pc = computers[rng.gen_range(0..computers.len())];
        let topo = world.topology_mut();

        match rng.gen_range(0..6) {
            0 => {
                let _ = topo.link_routers(a, b);
            }
            1 => {
                topo.unlink_routers(a, b).unwrap();
            }
            2 => {
                let backbone = backbones[rng.gen_range(0..backbones.len())];
                topo.attach_backbone(a, backbone).unwrap();
            }
            3 => {
                topo.detach_backbone(a).unwrap();
            }
            4 => {
                let host = rng.gen_range(1..4);
                let _ = world.attach_computer(pc, a, host);
            }
            _ => world.detach_computer(pc).unwrap(),
        }

        let violations = world.topology().link_violations();
        assert!(violations.is_empty(), "step {step}: {violations:?}");
    }
}
