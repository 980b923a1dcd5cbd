//! # Socket Session
//!
//! One end of a session: handshake, buffered delivery, keepalive and
//! teardown. Timers live in a per-socket [`Scheduler`] in two groups,
//! `"network"` (timeouts, keepalive) run before `"process"` (payload
//! delivery) every tick.

use std::collections::VecDeque;
use std::fmt;

use gridlink_core::{dispatch_isolated, Scheduler};

use super::context::NetContext;
use super::handler::{PacketHandler, Replies};
use super::state::SocketState;
use crate::address::Address;
use crate::config::SocketTimings;
use crate::error::{NetworkError, NetworkResult};
use crate::ids::SocketId;
use crate::packet::{ControlFrame, Frame, Packet, Payload};
use crate::snapshot::SocketRecord;

/// Abandons an unfinished handshake.
pub const TASK_CONNECTION_TIMEOUT: &str = "connection-timeout";
/// Periodic liveness probe.
pub const TASK_KEEPALIVE: &str = "keepalive";
/// Disconnects if a probe goes unanswered.
pub const TASK_KEEPALIVE_TIMEOUT: &str = "keepalive-timeout";
/// Hands buffered payloads to the handlers.
pub const TASK_DELIVER: &str = "deliver";

/// Group of protocol timers.
pub const GROUP_NETWORK: &str = "network";
/// Group of payload processing.
pub const GROUP_PROCESS: &str = "process";

/// Work a socket schedules for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketTask {
    /// Handshake did not finish in time.
    ConnectionTimeout,
    /// Send a keepalive request.
    KeepaliveProbe,
    /// The last keepalive request was never answered.
    KeepaliveTimeout,
    /// Flush payloads that arrived before this tick.
    DeliverBuffered,
}

/// Notifications the registry consumes after every socket call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SocketEvent {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq)]
struct Buffered {
    arrived_tick: u64,
    payload: Payload,
}

/// One end of a session between a local port and a remote address.
pub struct Socket {
    id: SocketId,
    local_port: u16,
    destination: Address,
    state: SocketState,
    seq: u32,
    accepted: bool,
    handlers: Vec<Box<dyn PacketHandler>>,
    incoming: VecDeque<Buffered>,
    scheduler: Scheduler<SocketTask>,
    events: Vec<SocketEvent>,
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("id", &self.id)
            .field("local_port", &self.local_port)
            .field("destination", &self.destination)
            .field("state", &self.state)
            .field("seq", &self.seq)
            .field("accepted", &self.accepted)
            .field("handlers", &self.handlers.len())
            .field("buffered", &self.incoming.len())
            .finish_non_exhaustive()
    }
}

impl Socket {
    pub(crate) fn new(id: SocketId, destination: Address) -> Self {
        Self {
            id,
            local_port: 0,
            destination,
            state: SocketState::Inactive,
            seq: 0,
            accepted: false,
            handlers: Vec::new(),
            incoming: VecDeque::new(),
            scheduler: Scheduler::new(),
            events: Vec::new(),
        }
    }

    /// Rebuilds a live socket, re-arming the timers its state needs.
    ///
    /// Buffered payloads are stamped with `tick` and flushed on the next one.
    pub(crate) fn restore(
        id: SocketId,
        record: SocketRecord,
        tick: u64,
        timings: &SocketTimings,
    ) -> NetworkResult<Self> {
        let SocketRecord {
            local_port,
            destination,
            state,
            seq,
            accepted,
            buffered,
        } = record;
        if local_port == 0 {
            return Err(NetworkError::Snapshot(format!("{id} has no local port")));
        }
        let mut socket = Self::new(id, destination);
        socket.local_port = local_port;
        socket.seq = seq;
        socket.accepted = accepted;
        socket.state = state;

        match state {
            SocketState::Inactive => {}
            SocketState::HandshakeSyn => socket.arm_connection_timeout(timings)?,
            SocketState::Connected => {
                socket.arm_session_tasks(timings)?;
                socket.incoming = buffered
                    .into_iter()
                    .map(|payload| Buffered {
                        arrived_tick: tick,
                        payload,
                    })
                    .collect();
            }
            SocketState::ReceivedTeardown | SocketState::Disconnected => {
                return Err(NetworkError::Snapshot(format!(
                    "{id} cannot be restored in state {state}"
                )));
            }
        }
        Ok(socket)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Registry-local identifier.
    #[must_use]
    pub const fn id(&self) -> SocketId {
        self.id
    }

    /// Local port, unique per destination.
    #[must_use]
    pub const fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Remote address.
    #[must_use]
    pub const fn destination(&self) -> Address {
        self.destination
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SocketState {
        self.state
    }

    /// Returns true in `Connected`.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SocketState::Connected
    }

    /// This side's current sequence number.
    #[must_use]
    pub const fn current_seq_number(&self) -> u32 {
        self.seq
    }

    /// Timers currently armed.
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler<SocketTask> {
        &self.scheduler
    }

    /// Payloads waiting for delivery.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.incoming.len()
    }

    /// Payloads waiting for delivery, oldest first.
    pub fn buffered(&self) -> impl Iterator<Item = &Payload> {
        self.incoming.iter().map(|b| &b.payload)
    }

    /// Number of attached handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Attaches a payload handler. Handlers run in attachment order.
    pub fn add_handler(&mut self, handler: impl PacketHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Attaches an already boxed handler.
    pub fn add_boxed_handler(&mut self, handler: Box<dyn PacketHandler>) {
        self.handlers.push(handler);
    }

    /// True for sockets created for an inbound connection request.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        self.accepted
    }

    pub(crate) fn mark_accepted(&mut self) {
        self.accepted = true;
    }

    pub(crate) fn set_local_port(&mut self, port: u16) {
        self.local_port = port;
    }

    pub(crate) fn take_events(&mut self) -> Vec<SocketEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Starts the handshake as initiator.
    pub(crate) fn connect(&mut self, ctx: &mut NetContext<'_>) -> NetworkResult<()> {
        if self.state != SocketState::Inactive {
            return Err(NetworkError::InvalidState {
                socket: self.id,
                state: self.state,
                operation: "connect",
            });
        }
        if ctx.local_net_id.is_none() {
            return Err(NetworkError::Unaddressed);
        }

        self.seq = ctx.rng.next_u32();
        self.arm_connection_timeout(ctx.timings)?;
        self.transition(SocketState::HandshakeSyn);
        self.send_control(ControlFrame::Syn { seq: self.seq }, ctx);
        Ok(())
    }

    /// Sends a user payload.
    pub(crate) fn send(&mut self, payload: Payload, ctx: &mut NetContext<'_>) -> NetworkResult<()> {
        if self.state != SocketState::Connected {
            return Err(NetworkError::NotConnected {
                socket: self.id,
                state: self.state,
            });
        }
        self.emit(Frame::Data(payload), ctx)
    }

    /// Closes the socket. No-op once disconnected.
    ///
    /// A teardown goes out unless the peer already sent one or nothing was
    /// ever exchanged.
    pub(crate) fn disconnect(&mut self, ctx: &mut NetContext<'_>) {
        match self.state {
            SocketState::Disconnected => return,
            SocketState::HandshakeSyn | SocketState::Connected => {
                self.send_control(ControlFrame::Teardown, ctx);
            }
            SocketState::Inactive | SocketState::ReceivedTeardown => {}
        }
        self.close();
    }

    /// Handles an inbound frame addressed to this socket.
    pub(crate) fn handle(&mut self, frame: Frame, ctx: &mut NetContext<'_>) {
        match frame {
            Frame::Control(control) => self.handle_control(control, ctx),
            Frame::Data(payload) => {
                if self.state == SocketState::Connected {
                    self.incoming.push_back(Buffered {
                        arrived_tick: ctx.tick,
                        payload,
                    });
                } else {
                    self.violation("data", ctx);
                }
            }
        }
    }

    /// Advances the socket's timers by one tick.
    pub(crate) fn update(&mut self, ctx: &mut NetContext<'_>) {
        for group in [GROUP_NETWORK, GROUP_PROCESS] {
            if self.state == SocketState::Disconnected {
                return;
            }
            let fired = self.scheduler.update(group);
            dispatch_isolated(fired, |fired| self.run_task(fired.task, ctx));
        }
    }

    // =========================================================================
    // Protocol
    // =========================================================================

    fn handle_control(&mut self, control: ControlFrame, ctx: &mut NetContext<'_>) {
        match (self.state, control) {
            (SocketState::Inactive, ControlFrame::Syn { seq: theirs }) => {
                self.seq = ctx.rng.next_u32();
                if let Err(error) = self.arm_connection_timeout(ctx.timings) {
                    tracing::warn!(socket = %self.id, %error, "failed to arm connection timeout");
                }
                self.transition(SocketState::HandshakeSyn);
                self.send_control(
                    ControlFrame::SynAck {
                        seq: self.seq,
                        ack: theirs.wrapping_add(1),
                    },
                    ctx,
                );
            }
            (SocketState::HandshakeSyn, ControlFrame::SynAck { seq: theirs, ack }) => {
                if ack == self.seq.wrapping_add(1) {
                    self.send_control(
                        ControlFrame::Ack {
                            ack: theirs.wrapping_add(1),
                        },
                        ctx,
                    );
                    self.establish(ctx.timings);
                } else {
                    self.violation("syn-ack with wrong ack", ctx);
                }
            }
            (SocketState::HandshakeSyn, ControlFrame::Ack { ack }) => {
                if ack == self.seq.wrapping_add(1) {
                    self.establish(ctx.timings);
                } else {
                    self.violation("ack with wrong ack", ctx);
                }
            }
            (SocketState::Connected, ControlFrame::Teardown) => {
                self.transition(SocketState::ReceivedTeardown);
                self.close();
            }
            (SocketState::Connected, ControlFrame::KeepaliveRequest) => {
                self.send_control(ControlFrame::KeepaliveResponse, ctx);
            }
            (SocketState::Connected, ControlFrame::KeepaliveResponse) => {
                self.scheduler.cancel(TASK_KEEPALIVE_TIMEOUT);
            }
            (_, other) => self.violation(other.label(), ctx),
        }
    }

    fn establish(&mut self, timings: &SocketTimings) {
        self.scheduler.cancel(TASK_CONNECTION_TIMEOUT);
        self.transition(SocketState::Connected);
        if let Err(error) = self.arm_session_tasks(timings) {
            tracing::warn!(socket = %self.id, %error, "failed to arm session tasks");
        }
        self.events.push(SocketEvent::Connected);
    }

    fn arm_connection_timeout(&mut self, timings: &SocketTimings) -> NetworkResult<()> {
        self.scheduler.cancel(TASK_CONNECTION_TIMEOUT);
        self.scheduler.schedule(
            TASK_CONNECTION_TIMEOUT,
            GROUP_NETWORK,
            timings.connection_timeout_ticks,
            None,
            SocketTask::ConnectionTimeout,
        )?;
        Ok(())
    }

    fn arm_session_tasks(&mut self, timings: &SocketTimings) -> NetworkResult<()> {
        let interval = timings.keepalive_interval_ticks;
        self.scheduler.schedule(
            TASK_KEEPALIVE,
            GROUP_NETWORK,
            interval,
            Some(interval.max(1)),
            SocketTask::KeepaliveProbe,
        )?;
        self.scheduler.schedule(
            TASK_DELIVER,
            GROUP_PROCESS,
            1,
            Some(1),
            SocketTask::DeliverBuffered,
        )?;
        Ok(())
    }

    fn run_task(&mut self, task: SocketTask, ctx: &mut NetContext<'_>) -> NetworkResult<()> {
        match task {
            SocketTask::ConnectionTimeout => {
                if self.state == SocketState::HandshakeSyn {
                    tracing::debug!(socket = %self.id, destination = %self.destination, "handshake timed out");
                    self.close();
                }
                Ok(())
            }
            SocketTask::KeepaliveProbe => {
                if self.state != SocketState::Connected {
                    return Ok(());
                }
                // An outstanding probe keeps its original deadline
                if !self.scheduler.is_scheduled(TASK_KEEPALIVE_TIMEOUT) {
                    self.scheduler.schedule(
                        TASK_KEEPALIVE_TIMEOUT,
                        GROUP_NETWORK,
                        ctx.timings.keepalive_timeout_ticks,
                        None,
                        SocketTask::KeepaliveTimeout,
                    )?;
                }
                self.emit(Frame::Control(ControlFrame::KeepaliveRequest), ctx)
            }
            SocketTask::KeepaliveTimeout => {
                tracing::warn!(socket = %self.id, destination = %self.destination, "keepalive timed out");
                self.disconnect(ctx);
                Ok(())
            }
            SocketTask::DeliverBuffered => {
                self.flush_buffered(ctx);
                Ok(())
            }
        }
    }

    /// Hands every payload that arrived before this tick to the handlers.
    fn flush_buffered(&mut self, ctx: &mut NetContext<'_>) {
        while self.state == SocketState::Connected {
            let due = self
                .incoming
                .front()
                .is_some_and(|b| b.arrived_tick < ctx.tick);
            if !due {
                break;
            }
            let Some(entry) = self.incoming.pop_front() else {
                break;
            };

            let mut handlers = std::mem::take(&mut self.handlers);
            for handler in &mut handlers {
                let mut replies = Replies::default();
                handler.handle_payload(&entry.payload, &mut replies);
                self.apply_replies(replies, ctx);
                if self.state != SocketState::Connected {
                    break;
                }
            }
            handlers.append(&mut self.handlers);
            self.handlers = handlers;
        }
    }

    fn apply_replies(&mut self, replies: Replies, ctx: &mut NetContext<'_>) {
        let (outgoing, disconnect) = replies.into_parts();
        for payload in outgoing {
            if let Err(error) = self.send(payload, ctx) {
                tracing::debug!(socket = %self.id, %error, "handler reply dropped");
            }
        }
        if disconnect {
            self.disconnect(ctx);
        }
    }

    fn violation(&mut self, what: &str, ctx: &mut NetContext<'_>) {
        tracing::debug!(
            socket = %self.id,
            state = %self.state,
            frame = what,
            "protocol violation"
        );
        if self.state == SocketState::Connected {
            self.disconnect(ctx);
        } else {
            self.close();
        }
    }

    fn transition(&mut self, next: SocketState) {
        tracing::debug!(socket = %self.id, from = %self.state, to = %next, "socket state");
        self.state = next;
    }

    fn close(&mut self) {
        if self.state == SocketState::Disconnected {
            return;
        }
        self.transition(SocketState::Disconnected);
        self.scheduler.clear();
        self.incoming.clear();
        self.events.push(SocketEvent::Disconnected);
    }

    fn send_control(&mut self, control: ControlFrame, ctx: &mut NetContext<'_>) {
        if let Err(error) = self.emit(Frame::Control(control), ctx) {
            tracing::debug!(socket = %self.id, frame = control.label(), %error, "control frame not sent");
        }
    }

    fn emit(&self, frame: Frame, ctx: &mut NetContext<'_>) -> NetworkResult<()> {
        let net_id = ctx.local_net_id.ok_or(NetworkError::Unaddressed)?;
        let source = Address::new(net_id, self.local_port)?;
        ctx.outbox.push(Packet::new(source, self.destination, frame));
        Ok(())
    }
}
