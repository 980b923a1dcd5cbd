//! # Tick Driver
//!
//! Fixed-cadence outer loop of the simulation.
//!
//! ## Design
//!
//! The driver must:
//! - Run every registered action exactly once per tick, in registration order
//! - Keep cadence without drift (deadlines advance by a fixed delay)
//! - Survive failing actions: log them and keep looping
//! - Stop only when explicitly interrupted through a [`StopHandle`]

mod driver;
mod queue;

pub use driver::{ActionError, StopHandle, TickDriver};
pub use queue::{InvocationQueue, Invoker};

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default simulation rate (ticks per second).
pub const DEFAULT_TICK_RATE: u32 = 20;

/// Tick driver configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Ticks per second. Zero runs unpaced.
    pub tick_rate: u32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

impl TickConfig {
    /// Wall-clock delay between two tick deadlines.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        if self.tick_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(1_000_000 / u64::from(self.tick_rate))
    }
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Minimum tick duration observed.
    pub min_tick_us: u64,
    /// Maximum tick duration observed.
    pub max_tick_us: u64,
    /// Average tick duration (rolling).
    pub avg_tick_us: u64,
    /// Number of late ticks (took longer than budget).
    pub late_ticks: u64,
    /// Total ticks measured.
    pub total_ticks: u64,
    /// Actions that failed or panicked.
    pub failed_actions: u64,
}

impl TickStats {
    pub(crate) fn record(&mut self, duration: Duration, budget: Duration) {
        let duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        if self.total_ticks == 0 {
            self.min_tick_us = duration_us;
            self.avg_tick_us = duration_us;
        }
        self.total_ticks += 1;
        self.min_tick_us = self.min_tick_us.min(duration_us);
        self.max_tick_us = self.max_tick_us.max(duration_us);

        // Rolling average
        self.avg_tick_us = (self.avg_tick_us * 15 + duration_us) / 16;

        if !budget.is_zero() && duration > budget {
            self.late_ticks += 1;
        }
    }
}
