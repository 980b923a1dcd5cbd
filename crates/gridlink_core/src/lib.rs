//! # GRIDLINK Core Kernel
//!
//! Deterministic building blocks for the in-game network simulation:
//! - Generational slabs so world entities can reference each other by handle
//! - A per-entity tick scheduler with named execution groups
//! - A fixed-cadence tick driver that never lets one failing action stop the loop
//!
//! ## Architecture Rules
//!
//! 1. **One simulation thread** - the world is owned by the driver thread;
//!    other threads talk to the simulation only through [`InvocationQueue`]
//! 2. **Time is ticks** - no component reads the wall clock except the driver
//! 3. **Failures are isolated** - a failing task or action is logged, never propagated
//!
//! ## Example
//!
//! ```rust,ignore
//! use gridlink_core::{Scheduler, TickDriver, TickConfig};
//!
//! let mut scheduler: Scheduler<&str> = Scheduler::new();
//! scheduler.schedule("probe", "network", 5, Some(5), "keepalive")?;
//!
//! let mut driver = TickDriver::new(&TickConfig::default(), scheduler);
//! driver.add_action("scheduler", |s, _tick| {
//!     for fired in s.update("network") {
//!         tracing::info!(task = %fired.name, "fired");
//!     }
//!     Ok(())
//! });
//! driver.run_for(60);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
pub mod schedule;
pub mod tick;

pub use error::{ScheduleError, ScheduleResult};
pub use memory::{Slab, SlotId};
pub use schedule::{dispatch_isolated, FiredTask, ScheduledTask, Scheduler};
pub use tick::{
    ActionError, InvocationQueue, Invoker, StopHandle, TickConfig, TickDriver, TickStats,
};
