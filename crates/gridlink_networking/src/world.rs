//! # Network World
//!
//! Owns the topology, the computers and the packet outbox. Every public
//! operation that can emit packets drains the outbox before returning, so
//! callers always observe a quiet network: handshakes finished, teardowns
//! delivered, replies to replies routed.
//!
//! ## Outbox
//!
//! Sockets never call into the network. They push packets to their context,
//! the world queues them with the sending computer, then routes them one by
//! one. Delivery may queue more packets; the drain continues until the queue
//! is empty or the per-drain budget runs out.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use gridlink_core::Slab;

use crate::address::{Address, NetId};
use crate::computer::Computer;
use crate::config::NetworkConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::ids::{BackboneId, ComputerId, NodeId, RouterId, SocketId};
use crate::interface::NodeNetInterface;
use crate::packet::{Packet, Payload};
use crate::routing::{Delivery, DropReason};
use crate::socket::{NetContext, Socket, SocketConnectionListener, SocketRegistry};
use crate::topology::Topology;

/// Packet counters since the world was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldStats {
    /// Packets taken off the outbox.
    pub packets_routed: u64,
    /// Packets that reached a node.
    pub packets_delivered: u64,
    /// Packets dropped by routing or discarded on budget overflow.
    pub packets_dropped: u64,
    /// Drains that hit the packet budget.
    pub flush_overflows: u64,
}

/// The simulated network and everything attached to it.
#[derive(Debug)]
pub struct NetworkWorld {
    pub(crate) config: NetworkConfig,
    pub(crate) topology: Topology,
    pub(crate) computers: Slab<Computer>,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) outbox: VecDeque<(ComputerId, Packet)>,
    pub(crate) tick: u64,
    pub(crate) stats: WorldStats,
}

impl NetworkWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            topology: Topology::new(config.routing.max_hops),
            computers: Slab::new(),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            outbox: VecDeque::new(),
            tick: 0,
            stats: WorldStats::default(),
            config,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Ticks elapsed.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Packet counters.
    #[must_use]
    pub const fn stats(&self) -> &WorldStats {
        &self.stats
    }

    /// The link graph.
    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The link graph, mutably, for link changes.
    pub fn topology_mut(&mut self) -> &mut Topology {
        &mut self.topology
    }

    /// Looks up a computer.
    #[must_use]
    pub fn computer(&self, computer: ComputerId) -> Option<&Computer> {
        self.computers.get(computer.slot())
    }

    /// Looks up a computer mutably.
    pub fn computer_mut(&mut self, computer: ComputerId) -> Option<&mut Computer> {
        self.computers.get_mut(computer.slot())
    }

    /// Iterates over computers.
    pub fn computers(&self) -> impl Iterator<Item = (ComputerId, &Computer)> {
        self.computers
            .iter()
            .map(|(id, c)| (ComputerId::from_slot(id), c))
    }

    /// Finds a computer by name.
    #[must_use]
    pub fn computer_by_name(&self, name: &str) -> Option<ComputerId> {
        self.computers()
            .find(|(_, c)| c.name() == name)
            .map(|(id, _)| id)
    }

    /// Node interface of a computer.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComputer` for a stale handle.
    pub fn node_of(&self, computer: ComputerId) -> NetworkResult<NodeId> {
        self.computer(computer)
            .map(Computer::node)
            .ok_or(NetworkError::UnknownComputer(computer))
    }

    /// Net id of a computer, if assigned.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComputer` for a stale handle.
    pub fn net_id_of(&self, computer: ComputerId) -> NetworkResult<Option<NetId>> {
        let node = self.node_of(computer)?;
        Ok(self.topology.node(node).and_then(NodeNetInterface::net_id))
    }

    /// Looks up a live socket.
    #[must_use]
    pub fn socket(&self, computer: ComputerId, socket: SocketId) -> Option<&Socket> {
        self.computer(computer)?.os().net_module().socket(socket)
    }

    /// Looks up a live socket mutably, e.g. to attach handlers.
    pub fn socket_mut(&mut self, computer: ComputerId, socket: SocketId) -> Option<&mut Socket> {
        self.computer_mut(computer)?
            .os_mut()
            .net_module_mut()
            .socket_mut(socket)
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Adds a router serving `subnet`.
    pub fn add_router(&mut self, subnet: u32) -> RouterId {
        self.topology.add_router(subnet)
    }

    /// Adds an empty backbone.
    pub fn add_backbone(&mut self) -> BackboneId {
        self.topology.add_backbone()
    }

    /// Adds an unconnected computer with its own node interface.
    pub fn add_computer(&mut self, name: impl Into<String>) -> ComputerId {
        let id = ComputerId::from_slot(self.computers.next_id());
        let node = self.topology.add_node(id);
        let name = name.into();
        tracing::debug!(computer = %id, %name, "computer added");
        ComputerId::from_slot(self.computers.insert(Computer::new(name, node)))
    }

    /// Shuts a computer down and removes it.
    ///
    /// Its sockets send their teardowns before the node goes away.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComputer` for a stale handle.
    pub fn remove_computer(&mut self, computer: ComputerId) -> NetworkResult<Computer> {
        self.set_running(computer, false)?;
        let node = self.node_of(computer)?;
        self.topology.remove_node(node)?;
        self.computers
            .remove(computer.slot())
            .ok_or(NetworkError::UnknownComputer(computer))
    }

    /// Connects a computer to `router` and gives it net id `subnet.host_id`.
    ///
    /// # Errors
    ///
    /// - `UnknownComputer` or `UnknownRouter` for stale handles
    /// - `NetIdInUse` if another node holds the net id
    pub fn attach_computer(
        &mut self,
        computer: ComputerId,
        router: RouterId,
        host_id: u32,
    ) -> NetworkResult<NetId> {
        let node = self.node_of(computer)?;
        let subnet = self
            .topology
            .router(router)
            .ok_or(NetworkError::UnknownRouter(router))?
            .subnet();
        let net_id = NetId::new(subnet, host_id);
        if self.topology.node_by_net_id(net_id).is_some_and(|n| n != node) {
            return Err(NetworkError::NetIdInUse(net_id));
        }
        self.topology.connect_node(node, router)?;
        self.topology.set_net_id(node, Some(net_id))?;
        Ok(net_id)
    }

    /// Disconnects a computer from its router and clears its net id.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComputer` for a stale handle.
    pub fn detach_computer(&mut self, computer: ComputerId) -> NetworkResult<()> {
        let node = self.node_of(computer)?;
        self.topology.disconnect_node(node)
    }

    // =========================================================================
    // Sockets
    // =========================================================================

    /// Registers a connection listener on a computer.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComputer` for a stale handle.
    pub fn add_listener(
        &mut self,
        computer: ComputerId,
        listener: impl SocketConnectionListener + 'static,
    ) -> NetworkResult<()> {
        self.computer_mut(computer)
            .ok_or(NetworkError::UnknownComputer(computer))?
            .os_mut()
            .net_module_mut()
            .add_listener(listener);
        Ok(())
    }

    /// Creates a socket on a computer. See [`SocketRegistry::create_socket`].
    ///
    /// # Errors
    ///
    /// `UnknownComputer`, plus the registry's errors.
    pub fn create_socket(
        &mut self,
        computer: ComputerId,
        destination: Address,
        local_port: Option<u16>,
    ) -> NetworkResult<SocketId> {
        self.run_registry(computer, |registry, ctx| {
            registry.create_socket(destination, local_port, ctx)
        })?
    }

    /// Starts a handshake. Returns once the exchange has settled.
    ///
    /// # Errors
    ///
    /// `UnknownComputer`, plus the registry's errors.
    pub fn connect(&mut self, computer: ComputerId, socket: SocketId) -> NetworkResult<()> {
        self.run_registry(computer, |registry, ctx| registry.connect(socket, ctx))?
    }

    /// Sends a user payload on a connected socket.
    ///
    /// # Errors
    ///
    /// `UnknownComputer`, plus the registry's errors.
    pub fn send(
        &mut self,
        computer: ComputerId,
        socket: SocketId,
        payload: impl Into<Payload>,
    ) -> NetworkResult<()> {
        let payload = payload.into();
        self.run_registry(computer, |registry, ctx| {
            registry.send(socket, payload, ctx)
        })?
    }

    /// Disconnects a socket. Returns false if it was not live.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComputer` for a stale handle.
    pub fn disconnect(&mut self, computer: ComputerId, socket: SocketId) -> NetworkResult<bool> {
        self.run_registry(computer, |registry, ctx| registry.disconnect(socket, ctx))
    }

    /// Starts or shuts down a computer's network module.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComputer` for a stale handle.
    pub fn set_running(&mut self, computer: ComputerId, running: bool) -> NetworkResult<()> {
        self.run_registry(computer, |registry, ctx| registry.set_running(running, ctx))
    }

    // =========================================================================
    // Packets
    // =========================================================================

    /// Sends a raw packet from a computer's node interface.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComputer` for a stale handle.
    pub fn inject(&mut self, computer: ComputerId, packet: Packet) -> NetworkResult<()> {
        if self.computer(computer).is_none() {
            return Err(NetworkError::UnknownComputer(computer));
        }
        self.outbox.push_back((computer, packet));
        self.flush();
        Ok(())
    }

    /// Hands a raw packet to a router and delivers it wherever it lands.
    pub fn inject_at_router(&mut self, router: RouterId, packet: Packet) -> Delivery {
        let delivery = self.topology.process_from_router(router, &packet);
        self.deliver(delivery, packet);
        self.flush();
        delivery
    }

    /// Advances the simulation by one tick.
    ///
    /// Each computer's sockets run their timers, then whatever they emitted is
    /// routed before the next computer runs.
    pub fn tick(&mut self) {
        self.tick += 1;
        for slot in self.computers.ids() {
            let computer = ComputerId::from_slot(slot);
            if let Err(error) = self.run_registry(computer, |registry, ctx| registry.update(ctx)) {
                tracing::debug!(%computer, %error, "computer skipped");
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Runs `op` against a computer's registry, queueing what it emits.
    fn with_registry<R>(
        &mut self,
        computer: ComputerId,
        op: impl FnOnce(&mut SocketRegistry, &mut NetContext<'_>) -> R,
    ) -> NetworkResult<R> {
        let entry = self
            .computers
            .get_mut(computer.slot())
            .ok_or(NetworkError::UnknownComputer(computer))?;
        let local_net_id = self
            .topology
            .node(entry.node())
            .and_then(NodeNetInterface::net_id);

        let mut emitted = Vec::new();
        let mut ctx = NetContext::new(
            self.tick,
            local_net_id,
            &mut self.rng,
            &mut emitted,
            &self.config.sockets,
        );
        let result = op(entry.os_mut().net_module_mut(), &mut ctx);

        self.outbox
            .extend(emitted.into_iter().map(|packet| (computer, packet)));
        Ok(result)
    }

    /// Like [`with_registry`](Self::with_registry), then drains the outbox.
    fn run_registry<R>(
        &mut self,
        computer: ComputerId,
        op: impl FnOnce(&mut SocketRegistry, &mut NetContext<'_>) -> R,
    ) -> NetworkResult<R> {
        let result = self.with_registry(computer, op);
        self.flush();
        result
    }

    /// Routes queued packets until the network is quiet.
    fn flush(&mut self) {
        let budget = self.config.routing.max_packets_per_flush;
        let mut routed = 0usize;

        while let Some((origin, packet)) = self.outbox.pop_front() {
            if routed == budget {
                let discarded = u64::try_from(self.outbox.len() + 1).unwrap_or(u64::MAX);
                tracing::warn!(discarded, budget, "packet budget exhausted, discarding outbox");
                self.stats.packets_dropped += discarded;
                self.stats.flush_overflows += 1;
                self.outbox.clear();
                break;
            }
            routed += 1;
            self.stats.packets_routed += 1;

            let delivery = match self.computer(origin) {
                Some(computer) => self.topology.process_from_node(computer.node(), &packet),
                None => Delivery::Dropped(DropReason::UnknownInterface),
            };
            self.deliver(delivery, packet);
        }
    }

    fn deliver(&mut self, delivery: Delivery, packet: Packet) {
        match delivery {
            Delivery::Delivered { node, forwards } => {
                let Some(owner) = self.topology.node(node).map(NodeNetInterface::owner) else {
                    self.stats.packets_dropped += 1;
                    return;
                };
                tracing::trace!(
                    source = %packet.source(),
                    destination = %packet.destination(),
                    frame = packet.label(),
                    forwards,
                    "packet delivered"
                );
                self.stats.packets_delivered += 1;
                if let Err(error) =
                    self.with_registry(owner, |registry, ctx| registry.handle_packet(packet, ctx))
                {
                    tracing::debug!(%owner, %error, "delivery target vanished");
                }
            }
            Delivery::Dropped(reason) => {
                self.stats.packets_dropped += 1;
                tracing::trace!(
                    source = %packet.source(),
                    destination = %packet.destination(),
                    frame = packet.label(),
                    %reason,
                    "packet dropped"
                );
            }
        }
    }
}

impl Default for NetworkWorld {
    fn default() -> Self {
        Self::new(NetworkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::{PortListener, Replies, SocketState};

    fn echo_world() -> (NetworkWorld, ComputerId, ComputerId, NetId) {
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
        (world, server, client, server_id)
    }

    #[test]
    fn test_handshake_settles_within_call() {
        let (mut world, server, client, server_id) = echo_world();
        let destination = Address::new(server_id, 7).unwrap();

        let socket = world.create_socket(client, destination, None).unwrap();
        world.connect(client, socket).unwrap();

        assert_eq!(world.socket(client, socket).unwrap().state(), SocketState::Connected);
        let server_side = world.computer(server).unwrap().os().net_module();
        assert_eq!(server_side.len(), 1);
        assert!(server_side.sockets().all(Socket::is_connected));
        assert!(world.outbox.is_empty());
    }

    #[test]
    fn test_add_computer_node_points_back() {
        let mut world = NetworkWorld::default();
        let a = world.add_computer("a");
        let b = world.add_computer("b");
        for id in [a, b] {
            let node = world.node_of(id).unwrap();
            assert_eq!(world.topology().node(node).unwrap().owner(), id);
        }
        assert_eq!(world.computer_by_name("b"), Some(b));
    }

    #[test]
    fn test_remove_computer_tears_down_peer() {
        let (mut world, server, client, server_id) = echo_world();
        let socket = world
            .create_socket(client, Address::new(server_id, 7).unwrap(), None)
            .unwrap();
        world.connect(client, socket).unwrap();

        world.remove_computer(client).unwrap();

        assert!(world.computer(server).unwrap().os().net_module().is_empty());
        assert!(world.topology().link_violations().is_empty());
        assert_eq!(world.computer(client).map(Computer::name), None);
    }

    #[test]
    fn test_unaddressed_computer_cannot_connect() {
        let (mut world, _, _, server_id) = echo_world();
        let loner = world.add_computer("loner");
        let socket = world
            .create_socket(loner, Address::new(server_id, 7).unwrap(), None)
            .unwrap();
        assert_eq!(world.connect(loner, socket), Err(NetworkError::Unaddressed));
    }

    #[test]
    fn test_flush_budget_discards_overflow() {
        let mut config = NetworkConfig::default();
        config.routing.max_packets_per_flush = 1;
        let mut world = NetworkWorld::new(config);
        let router = world.add_router(1);
        let server = world.add_computer("server");
        let client = world.add_computer("client");
        let server_id = world.attach_computer(server, router, 1).unwrap();
        world.attach_computer(client, router, 2).unwrap();
        world
            .add_listener(server, PortListener::new(7, || |_: &Payload, _: &mut Replies| {}))
            .unwrap();

        // SYN fits the budget, the SYN-ACK does not
        let socket = world
            .create_socket(client, Address::new(server_id, 7).unwrap(), None)
            .unwrap();
        world.connect(client, socket).unwrap();

        assert_eq!(world.stats().flush_overflows, 1);
        assert_eq!(
            world.socket(client, socket).unwrap().state(),
            SocketState::HandshakeSyn
        );
    }
}
