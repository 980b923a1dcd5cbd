//! Scheduled task records.

/// A task registered with a [`Scheduler`](super::Scheduler).
#[derive(Debug, Clone)]
pub struct ScheduledTask<T> {
    name: String,
    group: String,
    /// Updates left before the task fires.
    remaining: u32,
    period: Option<u32>,
    payload: T,
}

impl<T> ScheduledTask<T> {
    pub(crate) fn new(
        name: String,
        group: String,
        remaining: u32,
        period: Option<u32>,
        payload: T,
    ) -> Self {
        Self {
            name,
            group,
            remaining,
            period,
            payload,
        }
    }

    /// Unique task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execution group the task belongs to.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Updates left before the task fires.
    #[must_use]
    pub const fn remaining_ticks(&self) -> u32 {
        self.remaining
    }

    /// Re-arm period, `None` for one-shot tasks.
    #[must_use]
    pub const fn period(&self) -> Option<u32> {
        self.period
    }

    /// The task payload.
    #[must_use]
    pub const fn payload(&self) -> &T {
        &self.payload
    }

    /// Decrements the countdown; true when the task is due.
    pub(crate) fn count_down(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }

    pub(crate) fn rearm(&mut self, period: u32) {
        self.remaining = period;
    }

    pub(crate) fn into_payload(self) -> T {
        self.payload
    }
}

/// A task that came due during [`Scheduler::update`](super::Scheduler::update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredTask<T> {
    /// Name the task was registered under.
    pub name: String,
    /// The task payload.
    pub task: T,
}

impl<T> FiredTask<T> {
    pub(crate) fn new(name: String, task: T) -> Self {
        Self { name, task }
    }
}
