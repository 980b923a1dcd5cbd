//! # Tick Scheduler
//!
//! Per-entity registry of delayed and periodic tasks, advanced once per tick
//! per execution group.
//!
//! ## Design
//!
//! Tasks are plain data. [`Scheduler::update`] hands back the tasks that came
//! due and the owner executes them, so a task is free to reschedule or cancel
//! siblings while it runs without aliasing the scheduler.
//!
//! ```text
//! tick N:  update("network")  -> [connection-timeout]
//!          update("process")  -> [deliver]
//! ```
//!
//! Ordering guarantee: tasks of one group that come due in the same update are
//! returned in registration order.

mod task;

pub use task::{FiredTask, ScheduledTask};

use std::fmt::Display;

use crate::error::{ScheduleError, ScheduleResult};

/// Registry of named tasks keyed by execution group.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    /// Live tasks in registration order.
    tasks: Vec<ScheduledTask<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Creates an empty scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Registers a task under a unique name.
    ///
    /// The task fires on the `initial_delay`-th update of its group (a delay
    /// of 0 behaves like 1). Periodic tasks fire again every `period` updates
    /// until cancelled.
    ///
    /// # Errors
    ///
    /// - `DuplicateName` if a live task already uses `name`
    /// - `ZeroPeriod` if `period` is `Some(0)`
    pub fn schedule(
        &mut self,
        name: impl Into<String>,
        group: impl Into<String>,
        initial_delay: u32,
        period: Option<u32>,
        task: T,
    ) -> ScheduleResult<()> {
        let name = name.into();
        if self.is_scheduled(&name) {
            return Err(ScheduleError::DuplicateName(name));
        }
        if period == Some(0) {
            return Err(ScheduleError::ZeroPeriod(name));
        }

        self.tasks.push(ScheduledTask::new(
            name,
            group.into(),
            initial_delay.max(1),
            period,
            task,
        ));
        Ok(())
    }

    /// Cancels a task by name, returning its payload.
    ///
    /// Cancelling a one-shot task that already fired is a no-op.
    pub fn cancel(&mut self, name: &str) -> Option<T> {
        let index = self.tasks.iter().position(|t| t.name() == name)?;
        Some(self.tasks.remove(index).into_payload())
    }

    /// Looks up a live task by name.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&ScheduledTask<T>> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    /// Returns true if a live task uses `name`.
    #[must_use]
    pub fn is_scheduled(&self, name: &str) -> bool {
        self.task(name).is_some()
    }

    /// Returns the number of live tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if no task is scheduled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates over live tasks in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledTask<T>> {
        self.tasks.iter()
    }

    /// Drops every task.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

impl<T: Clone> Scheduler<T> {
    /// Advances every task of `group` by one tick.
    ///
    /// Returns the tasks that came due, in registration order. One-shot tasks
    /// are removed; periodic tasks are re-armed with their period.
    pub fn update(&mut self, group: &str) -> Vec<FiredTask<T>> {
        let mut fired = Vec::new();
        let mut index = 0;

        while index < self.tasks.len() {
            let task = &mut self.tasks[index];
            if task.group() != group || !task.count_down() {
                index += 1;
                continue;
            }

            if let Some(period) = task.period() {
                task.rearm(period);
                fired.push(FiredTask::new(task.name().to_owned(), task.payload().clone()));
                index += 1;
            } else {
                let task = self.tasks.remove(index);
                let name = task.name().to_owned();
                fired.push(FiredTask::new(name, task.into_payload()));
            }
        }

        fired
    }
}

/// Runs fired tasks one after another, logging and isolating failures.
///
/// A task returning `Err` never prevents the remaining tasks from running.
/// Returns the number of failed tasks.
pub fn dispatch_isolated<T, E, F>(fired: Vec<FiredTask<T>>, mut run: F) -> usize
where
    E: Display,
    F: FnMut(FiredTask<T>) -> Result<(), E>,
{
    let mut failures = 0;
    for task in fired {
        let name = task.name.clone();
        if let Err(error) = run(task) {
            failures += 1;
            tracing::warn!(task = %name, %error, "scheduled task failed");
        }
    }
    failures
}
