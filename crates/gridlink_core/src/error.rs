//! # Core Error Types
//!
//! Errors raised synchronously by the scheduler.

use thiserror::Error;

/// Errors that can occur while registering scheduler tasks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A live task already uses this name.
    #[error("task name already scheduled: {0}")]
    DuplicateName(String),

    /// Periodic tasks need a period of at least one tick.
    #[error("task {0} has a zero-tick period")]
    ZeroPeriod(String),
}

/// Result type for scheduler operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;
