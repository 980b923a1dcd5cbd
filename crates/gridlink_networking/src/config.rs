//! # Network Configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! seed = 7
//!
//! [sockets]
//! connection_timeout_ticks = 20
//! keepalive_interval_ticks = 100
//! keepalive_timeout_ticks = 40
//!
//! [routing]
//! max_hops = 64
//! max_packets_per_flush = 65536
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default ticks a handshake may take before the socket gives up.
pub const DEFAULT_CONNECTION_TIMEOUT_TICKS: u32 = 20;
/// Default ticks between keepalive probes.
pub const DEFAULT_KEEPALIVE_INTERVAL_TICKS: u32 = 100;
/// Default ticks a probe may stay unanswered.
pub const DEFAULT_KEEPALIVE_TIMEOUT_TICKS: u32 = 40;
/// Default router visits per packet.
pub const DEFAULT_MAX_HOPS: u32 = 64;
/// Default packets routed per outbox drain.
pub const DEFAULT_MAX_PACKETS_PER_FLUSH: usize = 65_536;

/// Socket timers, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketTimings {
    /// Ticks from SYN (sent or received) until an unfinished handshake is abandoned.
    pub connection_timeout_ticks: u32,
    /// Ticks between keepalive probes on a connected socket.
    pub keepalive_interval_ticks: u32,
    /// Ticks a keepalive probe may stay unanswered.
    pub keepalive_timeout_ticks: u32,
}

impl Default for SocketTimings {
    fn default() -> Self {
        Self {
            connection_timeout_ticks: DEFAULT_CONNECTION_TIMEOUT_TICKS,
            keepalive_interval_ticks: DEFAULT_KEEPALIVE_INTERVAL_TICKS,
            keepalive_timeout_ticks: DEFAULT_KEEPALIVE_TIMEOUT_TICKS,
        }
    }
}

/// Routing limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Router visits after which a packet is dropped.
    pub max_hops: u32,
    /// Packets routed per outbox drain before the rest are discarded.
    pub max_packets_per_flush: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            max_packets_per_flush: DEFAULT_MAX_PACKETS_PER_FLUSH,
        }
    }
}

/// Configuration of a [`NetworkWorld`](crate::NetworkWorld).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Seed for sequence numbers and ephemeral ports.
    pub seed: u64,
    /// Socket timers.
    pub sockets: SocketTimings,
    /// Routing limits.
    pub routing: RoutingConfig,
}

impl NetworkConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `Parse` if the document does not match the schema.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Parse` if it is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
