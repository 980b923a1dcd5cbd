//! # Packets
//!
//! Control frames (handshake, keepalive, teardown) are a separate variant
//! from user data, so a user payload can never be mistaken for protocol
//! traffic whatever its content.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Opaque user payload.
pub type Payload = serde_json::Value;

/// Socket protocol messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlFrame {
    /// Opens a handshake with the sender's initial sequence number.
    Syn {
        /// Sender's sequence number.
        seq: u32,
    },
    /// Answers a SYN.
    SynAck {
        /// Responder's sequence number.
        seq: u32,
        /// Initiator's sequence number plus one.
        ack: u32,
    },
    /// Completes the handshake.
    Ack {
        /// Responder's sequence number plus one.
        ack: u32,
    },
    /// Closes the session. Never answered.
    Teardown,
    /// Liveness probe.
    KeepaliveRequest,
    /// Answer to a probe.
    KeepaliveResponse,
}

impl ControlFrame {
    /// Short name used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Syn { .. } => "handshake/syn",
            Self::SynAck { .. } => "handshake/syn-ack",
            Self::Ack { .. } => "handshake/ack",
            Self::Teardown => "teardown",
            Self::KeepaliveRequest => "keepalive/request",
            Self::KeepaliveResponse => "keepalive/response",
        }
    }
}

/// What a packet carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    /// Protocol traffic.
    Control(ControlFrame),
    /// User payload.
    Data(Payload),
}

/// Unit of transmission. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    source: Address,
    destination: Address,
    frame: Frame,
}

impl Packet {
    /// Creates a packet.
    #[must_use]
    pub const fn new(source: Address, destination: Address, frame: Frame) -> Self {
        Self {
            source,
            destination,
            frame,
        }
    }

    /// Creates a user data packet.
    #[must_use]
    pub fn data(source: Address, destination: Address, payload: impl Into<Payload>) -> Self {
        Self::new(source, destination, Frame::Data(payload.into()))
    }

    /// Creates a control packet.
    #[must_use]
    pub const fn control(source: Address, destination: Address, frame: ControlFrame) -> Self {
        Self::new(source, destination, Frame::Control(frame))
    }

    /// Sender address.
    #[must_use]
    pub const fn source(&self) -> Address {
        self.source
    }

    /// Receiver address.
    #[must_use]
    pub const fn destination(&self) -> Address {
        self.destination
    }

    /// Contents.
    #[must_use]
    pub const fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Consumes the packet, returning its contents.
    #[must_use]
    pub fn into_frame(self) -> Frame {
        self.frame
    }

    /// Log label for the frame.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match &self.frame {
            Frame::Control(control) => control.label(),
            Frame::Data(_) => "data",
        }
    }
}

/// One step of a router-level path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hop {
    /// Forward to the neighbour serving this subnet.
    Subnet(u32),
    /// Hand the packet to the router's backbone.
    Backbone,
}

/// A packet in flight between routers, with its remaining path.
///
/// Borrows the packet: routing only decides where it ends up.
#[derive(Clone, Debug)]
pub struct RoutedPacket<'p> {
    packet: &'p Packet,
    path: VecDeque<Hop>,
    forwards: u32,
}

impl<'p> RoutedPacket<'p> {
    /// Wraps a packet with an empty path.
    #[must_use]
    pub const fn new(packet: &'p Packet) -> Self {
        Self {
            packet,
            path: VecDeque::new(),
            forwards: 0,
        }
    }

    /// Wraps a packet with a precomputed path.
    #[must_use]
    pub fn with_path(packet: &'p Packet, path: impl IntoIterator<Item = Hop>) -> Self {
        Self {
            path: path.into_iter().collect(),
            ..Self::new(packet)
        }
    }

    /// The packet being routed.
    #[must_use]
    pub const fn packet(&self) -> &'p Packet {
        self.packet
    }

    /// Remaining hops.
    #[must_use]
    pub const fn path(&self) -> &VecDeque<Hop> {
        &self.path
    }

    /// Router-to-router hand-offs so far.
    #[must_use]
    pub const fn forwards(&self) -> u32 {
        self.forwards
    }

    pub(crate) fn next_hop(&mut self) -> Option<Hop> {
        self.path.pop_front()
    }

    pub(crate) fn replace_path(&mut self, path: Vec<Hop>) {
        self.path = path.into();
    }

    pub(crate) fn clear_path(&mut self) {
        self.path.clear();
    }

    /// Counts a hand-off to another router, returning the new total.
    pub(crate) fn forwarded(&mut self) -> u32 {
        self.forwards += 1;
        self.forwards
    }
}
