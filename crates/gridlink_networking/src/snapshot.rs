//! # World Snapshots
//!
//! Serializable form of a [`NetworkWorld`]. Entities are flat records that
//! refer to each other by [`RecordKey`]; loading creates every entity first,
//! then rebuilds the links in a second pass and rejects any snapshot whose
//! links disagree with each other.
//!
//! Live sockets are saved with their state, sequence number and undelivered
//! payloads; their timers are re-armed on load. Handlers and listeners are
//! runtime objects and must be re-attached by the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::address::{Address, NetId};
use crate::config::NetworkConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::ids::{BackboneId, ComputerId, RouterId};
use crate::packet::Payload;
use crate::socket::SocketState;
use crate::world::NetworkWorld;

/// Reference between records. Unique within one snapshot.
pub type RecordKey = u32;

/// A saved world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Tick the world was saved at.
    pub tick: u64,
    /// Every entity.
    pub records: Vec<EntityRecord>,
}

/// One saved entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityRecord {
    /// A router.
    Router(RouterRecord),
    /// A backbone.
    Backbone(BackboneRecord),
    /// A computer with its node interface and sockets.
    Computer(ComputerRecord),
}

/// Saved router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterRecord {
    /// Record key.
    pub key: RecordKey,
    /// Subnet served.
    pub subnet: u32,
    /// Computers attached, in attachment order.
    #[serde(default)]
    pub children: Vec<RecordKey>,
    /// Neighbour routers, in link order.
    #[serde(default)]
    pub neighbours: Vec<RecordKey>,
    /// Backbone, if attached.
    #[serde(default)]
    pub backbone: Option<RecordKey>,
}

/// Saved backbone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackboneRecord {
    /// Record key.
    pub key: RecordKey,
    /// Attached routers, in attachment order.
    #[serde(default)]
    pub routers: Vec<RecordKey>,
}

/// Saved computer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputerRecord {
    /// Record key.
    pub key: RecordKey,
    /// Display name.
    pub name: String,
    /// Net id of the node interface.
    #[serde(default)]
    pub net_id: Option<NetId>,
    /// Router the node hangs off.
    #[serde(default)]
    pub connection: Option<RecordKey>,
    /// Whether the network module is running.
    #[serde(default = "default_running")]
    pub running: bool,
    /// Live sockets.
    #[serde(default)]
    pub sockets: Vec<SocketRecord>,
}

const fn default_running() -> bool {
    true
}

/// Saved socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketRecord {
    /// Local port.
    pub local_port: u16,
    /// Remote address.
    pub destination: Address,
    /// Lifecycle state.
    pub state: SocketState,
    /// Current sequence number.
    pub seq: u32,
    /// Created for an inbound connection request.
    #[serde(default)]
    pub accepted: bool,
    /// Payloads not yet handed to handlers.
    #[serde(default)]
    pub buffered: Vec<Payload>,
}

#[derive(Clone, Copy)]
enum Handle {
    Router(RouterId),
    Backbone(BackboneId),
    Computer(ComputerId),
}

fn invalid(message: impl Into<String>) -> NetworkError {
    NetworkError::Snapshot(message.into())
}

impl NetworkWorld {
    /// Saves the world.
    ///
    /// Must be called between operations; the outbox is always empty then.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        let mut next_key: RecordKey = 0;
        let mut key = || {
            let k = next_key;
            next_key += 1;
            k
        };

        let backbone_keys: HashMap<BackboneId, RecordKey> =
            self.topology.backbones().map(|(id, _)| (id, key())).collect();
        let router_keys: HashMap<RouterId, RecordKey> =
            self.topology.routers().map(|(id, _)| (id, key())).collect();
        let computer_keys: HashMap<ComputerId, RecordKey> =
            self.computers().map(|(id, _)| (id, key())).collect();
        let node_keys: HashMap<_, RecordKey> = self
            .computers()
            .map(|(id, c)| (c.node(), computer_keys[&id]))
            .collect();

        let mut records = Vec::new();

        for (id, backbone) in self.topology.backbones() {
            records.push(EntityRecord::Backbone(BackboneRecord {
                key: backbone_keys[&id],
                routers: backbone.routers().iter().map(|r| router_keys[r]).collect(),
            }));
        }

        for (id, router) in self.topology.routers() {
            records.push(EntityRecord::Router(RouterRecord {
                key: router_keys[&id],
                subnet: router.subnet(),
                children: router
                    .children()
                    .iter()
                    .filter_map(|n| node_keys.get(n).copied())
                    .collect(),
                neighbours: router.neighbours().iter().map(|r| router_keys[r]).collect(),
                backbone: router.backbone().map(|b| backbone_keys[&b]),
            }));
        }

        for (id, computer) in self.computers() {
            let node = self.topology.node(computer.node());
            let registry = computer.os().net_module();
            records.push(EntityRecord::Computer(ComputerRecord {
                key: computer_keys[&id],
                name: computer.name().to_owned(),
                net_id: node.and_then(|n| n.net_id()),
                connection: node
                    .and_then(|n| n.connection())
                    .map(|r| router_keys[&r]),
                running: registry.is_running(),
                sockets: registry
                    .sockets()
                    .map(|s| SocketRecord {
                        local_port: s.local_port(),
                        destination: s.destination(),
                        state: s.state(),
                        seq: s.current_seq_number(),
                        accepted: s.is_accepted(),
                        buffered: s.buffered().cloned().collect(),
                    })
                    .collect(),
            }));
        }

        WorldSnapshot {
            tick: self.tick,
            records,
        }
    }

    /// Loads a saved world.
    ///
    /// # Errors
    ///
    /// - `Snapshot` for duplicate or dangling keys, one-sided links, or
    ///   sockets saved in a closing state
    /// - `SubnetMismatch` / `NetIdInUse` for invalid net ids
    pub fn from_snapshot(config: NetworkConfig, snapshot: WorldSnapshot) -> NetworkResult<Self> {
        let mut world = Self::new(config);
        world.tick = snapshot.tick;

        // Pass 1: entities
        let mut handles: HashMap<RecordKey, Handle> = HashMap::new();
        for record in &snapshot.records {
            let (key, handle) = match record {
                EntityRecord::Router(r) => (r.key, Handle::Router(world.add_router(r.subnet))),
                EntityRecord::Backbone(b) => (b.key, Handle::Backbone(world.add_backbone())),
                EntityRecord::Computer(c) => {
                    (c.key, Handle::Computer(world.add_computer(c.name.clone())))
                }
            };
            if handles.insert(key, handle).is_some() {
                return Err(invalid(format!("duplicate record key {key}")));
            }
        }

        let router = |key: RecordKey| match handles.get(&key) {
            Some(Handle::Router(id)) => Ok(*id),
            _ => Err(invalid(format!("key {key} is not a router"))),
        };
        let backbone = |key: RecordKey| match handles.get(&key) {
            Some(Handle::Backbone(id)) => Ok(*id),
            _ => Err(invalid(format!("key {key} is not a backbone"))),
        };
        let computer = |key: RecordKey| match handles.get(&key) {
            Some(Handle::Computer(id)) => Ok(*id),
            _ => Err(invalid(format!("key {key} is not a computer"))),
        };

        // Pass 2: links, restored in their saved order
        for record in &snapshot.records {
            match record {
                EntityRecord::Router(r) => {
                    let id = router(r.key)?;
                    let mut children = Vec::with_capacity(r.children.len());
                    for &child in &r.children {
                        children.push(world.node_of(computer(child)?)?);
                    }
                    let neighbours = r
                        .neighbours
                        .iter()
                        .map(|&k| router(k))
                        .collect::<NetworkResult<Vec<_>>>()?;
                    let attached = r.backbone.map(&backbone).transpose()?;

                    let interface = world
                        .topology
                        .routers
                        .get_mut(id.slot())
                        .ok_or(NetworkError::UnknownRouter(id))?;
                    for child in children {
                        interface.add_child(child);
                    }
                    for neighbour in neighbours {
                        interface.add_neighbour(neighbour);
                    }
                    interface.set_backbone(attached);
                }
                EntityRecord::Backbone(b) => {
                    let id = backbone(b.key)?;
                    let routers = b
                        .routers
                        .iter()
                        .map(|&k| router(k))
                        .collect::<NetworkResult<Vec<_>>>()?;
                    let entry = world
                        .topology
                        .backbones
                        .get_mut(id.slot())
                        .ok_or(NetworkError::UnknownBackbone(id))?;
                    for r in routers {
                        entry.add_router(r);
                    }
                }
                EntityRecord::Computer(c) => {
                    let node = world.node_of(computer(c.key)?)?;
                    let connection = c.connection.map(&router).transpose()?;
                    if let Some(n) = world.topology.nodes.get_mut(node.slot()) {
                        n.set_connection(connection);
                    }
                }
            }
        }

        let violations = world.topology.link_violations();
        if !violations.is_empty() {
            return Err(invalid(violations.join("; ")));
        }

        // Pass 3: addresses and sockets
        let timings = world.config.sockets;
        for record in snapshot.records {
            let EntityRecord::Computer(c) = record else {
                continue;
            };
            let id = computer(c.key)?;
            let node = world.node_of(id)?;
            world.topology.set_net_id(node, c.net_id)?;

            let registry = world
                .computer_mut(id)
                .ok_or(NetworkError::UnknownComputer(id))?
                .os_mut()
                .net_module_mut();
            for socket in c.sockets {
                registry.restore_socket(socket, snapshot.tick, &timings)?;
            }
            registry.set_running_flag(c.running);
        }

        tracing::info!(
            tick = world.tick,
            computers = world.computers.len(),
            routers = world.topology.routers.len(),
            "world restored"
        );
        Ok(world)
    }
}
