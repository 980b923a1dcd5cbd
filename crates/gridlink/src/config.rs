//! # Server Configuration
//!
//! One TOML file configures the whole server. Missing tables and fields
//! fall back to their defaults.
//!
//! ```toml
//! [tick]
//! tick_rate = 20
//!
//! [network]
//! seed = 7
//!
//! [network.sockets]
//! keepalive_interval_ticks = 100
//!
//! [demo]
//! echo_port = 7
//! ping_interval_ticks = 20
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use gridlink_core::TickConfig;
use gridlink_networking::{ConfigError, NetworkConfig};

/// Default port of the demo echo service.
pub const DEFAULT_ECHO_PORT: u16 = 7;
/// Default ticks between two demo pings.
pub const DEFAULT_PING_INTERVAL_TICKS: u64 = 20;

/// Settings of the built-in demo scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Port the echo service listens on.
    pub echo_port: u16,
    /// Ticks between pings sent by the demo client. Zero disables pings.
    pub ping_interval_ticks: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            echo_port: DEFAULT_ECHO_PORT,
            ping_interval_ticks: DEFAULT_PING_INTERVAL_TICKS,
        }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Tick driver cadence.
    pub tick: TickConfig,
    /// Simulated network.
    pub network: NetworkConfig,
    /// Demo scenario.
    pub demo: DemoConfig,
}

impl ServerConfig {
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
