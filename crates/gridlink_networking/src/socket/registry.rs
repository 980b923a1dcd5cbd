//! # Socket Registry
//!
//! A computer's network module: owns its live sockets, demultiplexes inbound
//! packets by `(local port, remote address)`, asks listeners about unmatched
//! traffic and drops sockets the moment they disconnect.

use rand::Rng;

use super::context::NetContext;
use super::listener::{ConnectionDecision, SocketConnectionListener};
use super::session::{Socket, SocketEvent};
use super::state::SocketState;
use crate::address::{Address, EPHEMERAL_PORTS};
use crate::config::SocketTimings;
use crate::error::{AddressError, NetworkError, NetworkResult};
use crate::ids::SocketId;
use crate::packet::{Packet, Payload};
use crate::snapshot::SocketRecord;

/// Live sockets and connection listeners of one computer.
pub struct SocketRegistry {
    sockets: Vec<Socket>,
    listeners: Vec<Box<dyn SocketConnectionListener>>,
    next_id: u64,
    running: bool,
}

impl Default for SocketRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SocketRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketRegistry")
            .field("sockets", &self.sockets)
            .field("listeners", &self.listeners.len())
            .field("running", &self.running)
            .finish_non_exhaustive()
    }
}

impl SocketRegistry {
    /// Creates a running registry with no sockets.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sockets: Vec::new(),
            listeners: Vec::new(),
            next_id: 1,
            running: true,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns true unless the module was shut down.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Number of live sockets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    /// Returns true if no socket is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }

    /// Live sockets, in creation order.
    pub fn sockets(&self) -> impl Iterator<Item = &Socket> {
        self.sockets.iter()
    }

    /// Looks up a live socket.
    #[must_use]
    pub fn socket(&self, id: SocketId) -> Option<&Socket> {
        self.sockets.iter().find(|s| s.id() == id)
    }

    /// Looks up a live socket mutably, e.g. to attach handlers.
    pub fn socket_mut(&mut self, id: SocketId) -> Option<&mut Socket> {
        self.sockets.iter_mut().find(|s| s.id() == id)
    }

    /// Finds the socket bound to `(local_port, destination)`.
    #[must_use]
    pub fn find(&self, local_port: u16, destination: Address) -> Option<&Socket> {
        self.sockets
            .iter()
            .find(|s| s.local_port() == local_port && s.destination() == destination)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Registers a connection listener. Listeners are asked in registration order.
    pub fn add_listener(&mut self, listener: impl SocketConnectionListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Starts or shuts down the module. Shutting down disconnects every socket.
    pub fn set_running(&mut self, running: bool, ctx: &mut NetContext<'_>) {
        if !running && self.running {
            let ids: Vec<SocketId> = self.sockets.iter().map(Socket::id).collect();
            for id in ids {
                self.disconnect(id, ctx);
            }
            tracing::info!("network module offline");
        }
        self.running = running;
    }

    /// Creates a socket towards `destination`.
    ///
    /// `None` picks a free ephemeral port.
    ///
    /// # Errors
    ///
    /// - `ModuleOffline` if the module is shut down
    /// - `InvalidPort` for an explicit port 0
    /// - `PortInUse` if a live socket already binds `(local_port, destination)`
    pub fn create_socket(
        &mut self,
        destination: Address,
        local_port: Option<u16>,
        ctx: &mut NetContext<'_>,
    ) -> NetworkResult<SocketId> {
        if !self.running {
            return Err(NetworkError::ModuleOffline);
        }

        let id = SocketId(self.next_id);
        self.next_id += 1;
        self.sockets.push(Socket::new(id, destination));

        // Registered first, then bound; a failed bind unregisters it again
        match self.pick_port(local_port, destination, ctx) {
            Ok(port) => {
                let index = self.sockets.len() - 1;
                self.sockets[index].set_local_port(port);
                tracing::debug!(socket = %id, port, %destination, "socket created");
                Ok(id)
            }
            Err(error) => {
                self.sockets.pop();
                Err(error)
            }
        }
    }

    /// Starts the handshake on a socket.
    ///
    /// # Errors
    ///
    /// - `UnknownSocket` if the socket is not live
    /// - `InvalidState` unless the socket is `Inactive`
    /// - `Unaddressed` if the computer has no net id
    pub fn connect(&mut self, id: SocketId, ctx: &mut NetContext<'_>) -> NetworkResult<()> {
        let index = self.index_of(id)?;
        let result = self.sockets[index].connect(ctx);
        self.settle(index);
        result
    }

    /// Sends a user payload.
    ///
    /// # Errors
    ///
    /// - `UnknownSocket` if the socket is not live
    /// - `NotConnected` unless the socket is `Connected`
    pub fn send(
        &mut self,
        id: SocketId,
        payload: Payload,
        ctx: &mut NetContext<'_>,
    ) -> NetworkResult<()> {
        let index = self.index_of(id)?;
        self.sockets[index].send(payload, ctx)
    }

    /// Disconnects and removes a socket. Returns false if it was not live.
    pub fn disconnect(&mut self, id: SocketId, ctx: &mut NetContext<'_>) -> bool {
        let Ok(index) = self.index_of(id) else {
            return false;
        };
        self.sockets[index].disconnect(ctx);
        self.settle(index);
        true
    }

    /// Dispatches an inbound packet to its socket, or to the listeners.
    pub fn handle_packet(&mut self, packet: Packet, ctx: &mut NetContext<'_>) {
        if !self.running {
            tracing::trace!(destination = %packet.destination(), "module offline, packet ignored");
            return;
        }

        let port = packet.destination().port();
        let source = packet.source();
        let index = match self
            .sockets
            .iter()
            .position(|s| s.local_port() == port && s.destination() == source)
        {
            Some(index) => index,
            None => {
                if !self.accepts(&packet) {
                    tracing::trace!(port, %source, frame = packet.label(), "connection refused");
                    return;
                }
                if let Err(error) = self.create_socket(source, Some(port), ctx) {
                    tracing::debug!(port, %source, %error, "inbound socket not created");
                    return;
                }
                let index = self.sockets.len() - 1;
                self.sockets[index].mark_accepted();
                index
            }
        };

        self.sockets[index].handle(packet.into_frame(), ctx);
        self.settle(index);
    }

    /// Advances every socket's timers by one tick.
    pub fn update(&mut self, ctx: &mut NetContext<'_>) {
        let ids: Vec<SocketId> = self.sockets.iter().map(Socket::id).collect();
        for id in ids {
            if let Ok(index) = self.index_of(id) {
                self.sockets[index].update(ctx);
                self.settle(index);
            }
        }
    }

    /// Rebuilds a socket from a snapshot record.
    pub(crate) fn restore_socket(
        &mut self,
        record: SocketRecord,
        tick: u64,
        timings: &SocketTimings,
    ) -> NetworkResult<SocketId> {
        if self.find(record.local_port, record.destination).is_some() {
            return Err(NetworkError::PortInUse {
                port: record.local_port,
                destination: record.destination,
            });
        }
        let id = SocketId(self.next_id);
        self.next_id += 1;
        self.sockets
            .push(Socket::restore(id, record, tick, timings)?);
        Ok(id)
    }

    pub(crate) fn set_running_flag(&mut self, running: bool) {
        self.running = running;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn index_of(&self, id: SocketId) -> NetworkResult<usize> {
        self.sockets
            .iter()
            .position(|s| s.id() == id)
            .ok_or(NetworkError::UnknownSocket(id))
    }

    fn port_taken(&self, port: u16, destination: Address) -> bool {
        // The socket being bound still has port 0, so it never matches itself
        self.find(port, destination).is_some()
    }

    fn pick_port(
        &self,
        requested: Option<u16>,
        destination: Address,
        ctx: &mut NetContext<'_>,
    ) -> NetworkResult<u16> {
        match requested {
            Some(0) => Err(AddressError::InvalidPort(0).into()),
            Some(port) if self.port_taken(port, destination) => {
                Err(NetworkError::PortInUse { port, destination })
            }
            Some(port) => Ok(port),
            None => loop {
                let port = ctx.rng.gen_range(EPHEMERAL_PORTS);
                if !self.port_taken(port, destination) {
                    break Ok(port);
                }
            },
        }
    }

    fn accepts(&mut self, packet: &Packet) -> bool {
        let mut allowed = false;
        for listener in &mut self.listeners {
            match listener.on_connection_request(packet) {
                ConnectionDecision::RejectImmediately => return false,
                ConnectionDecision::AllowAfterAll => allowed = true,
                ConnectionDecision::Skip => {}
            }
        }
        allowed
    }

    /// Applies a socket's pending events: listeners hear about new sessions,
    /// disconnected sockets leave the registry.
    fn settle(&mut self, index: usize) {
        let socket = &mut self.sockets[index];
        for event in socket.take_events() {
            match event {
                SocketEvent::Connected => {
                    tracing::info!(
                        socket = %socket.id(),
                        port = socket.local_port(),
                        peer = %socket.destination(),
                        "connection established"
                    );
                    for listener in &mut self.listeners {
                        listener.on_connected(socket);
                    }
                }
                SocketEvent::Disconnected => {
                    tracing::info!(socket = %socket.id(), peer = %socket.destination(), "connection closed");
                }
            }
        }
        if socket.state() == SocketState::Disconnected {
            self.sockets.remove(index);
        }
    }
}
