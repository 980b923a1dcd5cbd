//! Benchmark for routing and socket session throughput.
//!
//! Run with: cargo bench --package gridlink_networking --bench routing_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridlink_networking::{
    Address, NetId, NetworkWorld, Packet, Payload, PortListener, Replies, RouterId,
};

/// A chain of `len` routers, subnets 1..=len, plus a backbone joining the
/// two ends. One host sits at the far end.
fn create_chain(len: u32) -> (NetworkWorld, RouterId) {
    let mut world = NetworkWorld::default();
    let routers: Vec<_> = (1..=len).map(|subnet| world.add_router(subnet)).collect();
    for pair in routers.windows(2) {
        world.topology_mut().link_routers(pair[0], pair[1]).unwrap();
    }

    let backbone = world.add_backbone();
    world
        .topology_mut()
        .attach_backbone(routers[0], backbone)
        .unwrap();
    world
        .topology_mut()
        .attach_backbone(routers[routers.len() - 1], backbone)
        .unwrap();

    let host = world.add_computer("host");
    world
        .attach_computer(host, routers[routers.len() - 1], 1)
        .unwrap();
    (world, routers[0])
}

fn probe(destination: NetId) -> Packet {
    let source = Address::new(NetId::new(0, 1), 40000).unwrap();
    Packet::data(source, Address::new(destination, 80).unwrap(), "probe")
}

fn benchmark_chain_routing(c: &mut Criterion) {
    let (world, entry) = create_chain(32);
    let packet = probe(NetId::new(32, 1));

    c.bench_function("route_32_router_chain", |b| {
        b.iter(|| black_box(world.topology().process_from_router(entry, &packet)));
    });
}

fn benchmark_backbone_fallback(c: &mut Criterion) {
    let (mut world, entry) = create_chain(32);
    // Cut the chain in the middle so only the backbone connects the ends
    let routers: Vec<_> = world.topology().routers().map(|(id, _)| id).collect();
    world
        .topology_mut()
        .unlink_routers(routers[15], routers[16])
        .unwrap();
    let packet = probe(NetId::new(32, 1));

    c.bench_function("route_backbone_fallback", |b| {
        b.iter(|| black_box(world.topology().process_from_router(entry, &packet)));
    });
}

fn benchmark_session_echo(c: &mut Criterion) {
    c.bench_function("handshake_echo_teardown", |b| {
        b.iter(|| {
            let mut world = NetworkWorld::default();
            let router = world.add_router(1);
            let server = world.add_computer("server");
            let client = world.add_computer("client");
            let server_id = world.attach_computer(server, router, 1).unwrap();
            world.attach_computer(client, router, 2).unwrap();
            world
                .add_listener(
                    server,
                    PortListener::new(7, || {
                        |payload: &Payload, replies: &mut Replies| replies.send(payload.clone())
                    }),
                )
                .unwrap();

            let socket = world
                .create_socket(client, Address::new(server_id, 7).unwrap(), None)
                .unwrap();
            world.connect(client, socket).unwrap();
            world.send(client, socket, "ping").unwrap();
            world.tick();
            world.tick();
            black_box(world.disconnect(client, socket).unwrap())
        });
    });
}

criterion_group!(
    benches,
    benchmark_chain_routing,
    benchmark_backbone_fallback,
    benchmark_session_echo
);
criterion_main!(benches);
