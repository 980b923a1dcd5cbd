//! # Demo Scenario
//!
//! A small world the server runs out of the box:
//!
//! ```text
//!   client (10.1) ── router 10 ══╗
//!                                ║ backbone
//!   server (20.1) ── router 20 ══╝
//! ```
//!
//! The server echoes every payload it receives on the echo port. The client
//! keeps one session open, reconnects when it drops, and pings on a fixed
//! cadence.

use std::cell::Cell;
use std::rc::Rc;

use gridlink_networking::{
    Address, ComputerId, NetworkConfig, NetworkResult, NetworkWorld, Payload, PortListener,
    Replies, Socket, SocketId, SocketState,
};

use crate::config::DemoConfig;

/// Subnet of the client side.
pub const CLIENT_SUBNET: u32 = 10;
/// Subnet of the server side.
pub const SERVER_SUBNET: u32 = 20;

/// The demo world and the client session driving it.
#[derive(Debug)]
pub struct Demo {
    /// The simulated network.
    pub world: NetworkWorld,
    /// Computer running the echo service.
    pub server: ComputerId,
    /// Computer pinging the service.
    pub client: ComputerId,
    /// Where the echo service listens.
    pub service: Address,
    ping_interval: u64,
    session: Option<SocketId>,
    sessions_opened: u64,
    pings_sent: u64,
    echoes: Rc<Cell<u64>>,
}

impl Demo {
    /// Builds the demo world.
    ///
    /// # Errors
    ///
    /// Returns `Address` if the configured echo port is 0.
    pub fn build(network: NetworkConfig, demo: &DemoConfig) -> NetworkResult<Self> {
        let mut world = NetworkWorld::new(network);

        let client_router = world.add_router(CLIENT_SUBNET);
        let server_router = world.add_router(SERVER_SUBNET);
        let backbone = world.add_backbone();
        world
            .topology_mut()
            .attach_backbone(client_router, backbone)?;
        world
            .topology_mut()
            .attach_backbone(server_router, backbone)?;

        let server = world.add_computer("echo-server");
        let client = world.add_computer("client");
        let server_id = world.attach_computer(server, server_router, 1)?;
        world.attach_computer(client, client_router, 1)?;

        let service = Address::new(server_id, demo.echo_port)?;
        world.add_listener(
            server,
            PortListener::new(demo.echo_port, || {
                |payload: &Payload, replies: &mut Replies| replies.send(payload.clone())
            }),
        )?;

        tracing::info!(%service, "demo world ready");
        Ok(Self {
            world,
            server,
            client,
            service,
            ping_interval: demo.ping_interval_ticks,
            session: None,
            sessions_opened: 0,
            pings_sent: 0,
            echoes: Rc::new(Cell::new(0)),
        })
    }

    /// Live client session, if any.
    #[must_use]
    pub fn session(&self) -> Option<SocketId> {
        self.session
            .filter(|&id| self.world.socket(self.client, id).is_some())
    }

    /// Sessions the client has opened so far.
    #[must_use]
    pub const fn sessions_opened(&self) -> u64 {
        self.sessions_opened
    }

    /// Pings sent by the client.
    #[must_use]
    pub const fn pings_sent(&self) -> u64 {
        self.pings_sent
    }

    /// Echoes the client's handler has seen.
    #[must_use]
    pub fn echoes_received(&self) -> u64 {
        self.echoes.get()
    }

    /// Runs the client for the current tick: reopens a dropped session and
    /// sends a ping when one is due.
    ///
    /// # Errors
    ///
    /// Propagates socket errors, e.g. `ModuleOffline` if the client was shut down.
    pub fn drive_client(&mut self) -> NetworkResult<()> {
        let state = self
            .session
            .and_then(|id| self.world.socket(self.client, id))
            .map(Socket::state);

        match (state, self.session) {
            (None, _) => self.open_session(),
            (Some(SocketState::Connected), Some(id)) if self.ping_due() => {
                self.pings_sent += 1;
                let ping = format!("ping {}", self.pings_sent);
                self.world.send(self.client, id, ping)
            }
            // Handshake in flight or nothing due
            _ => Ok(()),
        }
    }

    fn ping_due(&self) -> bool {
        self.ping_interval > 0 && self.world.current_tick() % self.ping_interval == 0
    }

    fn open_session(&mut self) -> NetworkResult<()> {
        let id = self.world.create_socket(self.client, self.service, None)?;
        self.session = Some(id);
        self.sessions_opened += 1;
        self.world.connect(self.client, id)?;

        let echoes = Rc::clone(&self.echoes);
        if let Some(socket) = self.world.socket_mut(self.client, id) {
            socket.add_handler(move |payload: &Payload, _: &mut Replies| {
                echoes.set(echoes.get() + 1);
                tracing::debug!(%payload, "echo received");
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo(ping_interval_ticks: u64) -> Demo {
        let config = DemoConfig {
            ping_interval_ticks,
            ..DemoConfig::default()
        };
        Demo::build(NetworkConfig::default(), &config).unwrap()
    }

    fn run(demo: &mut Demo, ticks: u64) {
        for _ in 0..ticks {
            demo.world.tick();
            demo.drive_client().unwrap();
        }
    }

    #[test]
    fn test_build_links_both_subnets() {
        let demo = demo(20);
        assert_eq!(demo.service.net_id().subnet(), SERVER_SUBNET);
        assert!(demo.world.topology().link_violations().is_empty());
        assert_eq!(demo.world.topology().backbones().count(), 1);
    }

    #[test]
    fn test_first_drive_opens_session_over_backbone() {
        let mut demo = demo(20);
        demo.drive_client().unwrap();

        let id = demo.session().unwrap();
        assert!(demo.world.socket(demo.client, id).unwrap().is_connected());
        assert_eq!(demo.sessions_opened(), 1);
    }

    #[test]
    fn test_pings_are_echoed() {
        let mut demo = demo(5);
        run(&mut demo, 52);

        // Pings at ticks 5, 10, ..., 50; echoes reach the handler two ticks later
        assert_eq!(demo.pings_sent(), 10);
        assert_eq!(demo.echoes_received(), 10);
        assert_eq!(demo.sessions_opened(), 1);
    }

    #[test]
    fn test_dropped_session_is_reopened() {
        let mut demo = demo(0);
        run(&mut demo, 3);
        let first = demo.session().unwrap();

        demo.world.disconnect(demo.client, first).unwrap();
        assert!(demo.session().is_none());
        run(&mut demo, 1);

        assert_eq!(demo.sessions_opened(), 2);
        assert_ne!(demo.session(), Some(first));
    }

    #[test]
    fn test_bad_echo_port_fails_build() {
        let config = DemoConfig {
            echo_port: 0,
            ..DemoConfig::default()
        };
        assert!(Demo::build(NetworkConfig::default(), &config).is_err());
    }
}
