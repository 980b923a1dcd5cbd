//! Fixed-cadence driver loop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::queue::{InvocationQueue, Invoker};
use super::{TickConfig, TickStats};

/// Error type returned by tick actions.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

type Action<S> = Box<dyn FnMut(&mut S, u64) -> Result<(), ActionError>>;

struct NamedAction<S> {
    name: String,
    run: Action<S>,
}

/// Cloneable interruption flag for a running driver.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Requests the driver loop to exit after the current tick.
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Drives a simulation state at a fixed tick rate.
///
/// Each tick drains the [`InvocationQueue`], then runs every action in
/// registration order. A failing or panicking action is logged and counted;
/// the remaining actions and the loop itself keep going.
///
/// # Example
///
/// ```rust,ignore
/// let mut driver = TickDriver::new(&TickConfig::default(), world);
/// driver.add_action("world", |world, _tick| { world.tick(); Ok(()) });
/// let stop = driver.stop_handle();
/// driver.run(); // until stop.stop()
/// ```
pub struct TickDriver<S> {
    state: S,
    delay: Duration,
    actions: Vec<NamedAction<S>>,
    queue: InvocationQueue<S>,
    stop: StopHandle,
    tick: u64,
    stats: TickStats,
}

impl<S> TickDriver<S> {
    /// Creates a driver owning `state`.
    #[must_use]
    pub fn new(config: &TickConfig, state: S) -> Self {
        Self {
            state,
            delay: config.tick_duration(),
            actions: Vec::new(),
            queue: InvocationQueue::new(),
            stop: StopHandle::default(),
            tick: 0,
            stats: TickStats::default(),
        }
    }

    /// Appends an action run once per tick.
    pub fn add_action(
        &mut self,
        name: impl Into<String>,
        run: impl FnMut(&mut S, u64) -> Result<(), ActionError> + 'static,
    ) {
        self.actions.push(NamedAction {
            name: name.into(),
            run: Box::new(run),
        });
    }

    /// Returns a handle other threads can post closures through.
    #[must_use]
    pub fn invoker(&self) -> Invoker<S> {
        self.queue.invoker()
    }

    /// Returns the interruption handle.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// The driven state.
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// The driven state, mutably.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Consumes the driver, returning the state.
    pub fn into_state(self) -> S {
        self.state
    }

    /// Number of ticks executed.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Tick timing statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Target delay between ticks.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Executes one tick immediately, without pacing.
    pub fn step(&mut self) {
        let start = Instant::now();
        self.tick += 1;
        let tick = self.tick;

        self.queue.drain(&mut self.state);

        for action in &mut self.actions {
            let state = &mut self.state;
            let outcome = catch_unwind(AssertUnwindSafe(|| (action.run)(state, tick)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    self.stats.failed_actions += 1;
                    tracing::error!(action = %action.name, tick, %error, "tick action failed");
                }
                Err(_) => {
                    self.stats.failed_actions += 1;
                    tracing::error!(action = %action.name, tick, "tick action panicked");
                }
            }
        }

        self.stats.record(start.elapsed(), self.delay);
    }

    /// Runs until the stop handle is triggered.
    pub fn run(&mut self) {
        self.run_paced(None);
    }

    /// Runs at most `ticks` ticks, returning early if interrupted.
    pub fn run_for(&mut self, ticks: u64) {
        self.run_paced(Some(ticks));
    }

    fn run_paced(&mut self, limit: Option<u64>) {
        let mut next_deadline = Instant::now();
        let mut executed = 0u64;

        while !self.stop.is_stopped() && limit.map_or(true, |l| executed < l) {
            self.step();
            executed += 1;

            // Advance the deadline before sleeping so drift never accumulates
            next_deadline += self.delay;
            let now = Instant::now();
            if next_deadline > now {
                std::thread::sleep(next_deadline - now);
            }
        }

        tracing::debug!(executed, total = self.tick, "tick driver stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> TickConfig {
        TickConfig { tick_rate: 1000 }
    }

    #[test]
    fn test_actions_run_in_order_each_tick() {
        let mut driver = TickDriver::new(&fast_config(), Vec::<(u64, &str)>::new());
        driver.add_action("a", |log, tick| {
            log.push((tick, "a"));
            Ok(())
        });
        driver.add_action("b", |log, tick| {
            log.push((tick, "b"));
            Ok(())
        });

        driver.step();
        driver.step();

        assert_eq!(
            driver.state(),
            &vec![(1, "a"), (1, "b"), (2, "a"), (2, "b")]
        );
        assert_eq!(driver.tick_count(), 2);
    }

    #[test]
    fn test_failing_action_does_not_stop_others() {
        let mut driver = TickDriver::new(&fast_config(), 0u32);
        driver.add_action("broken", |_, _| Err("transient".into()));
        driver.add_action("panicky", |_, tick| {
            if tick == 1 {
                panic!("first tick only");
            }
            Ok(())
        });
        driver.add_action("counter", |n, _| {
            *n += 1;
            Ok(())
        });

        driver.run_for(3);

        assert_eq!(*driver.state(), 3);
        assert_eq!(driver.stats().failed_actions, 4);
    }

    #[test]
    fn test_invocations_drain_before_actions() {
        let mut driver = TickDriver::new(&fast_config(), Vec::<&str>::new());
        driver.add_action("action", |log, _| {
            log.push("action");
            Ok(())
        });

        let invoker = driver.invoker();
        std::thread::spawn(move || {
            invoker.invoke(|log| log.push("invoked"));
        })
        .join()
        .unwrap();

        driver.step();
        assert_eq!(driver.state(), &vec!["invoked", "action"]);
    }

    #[test]
    fn test_stop_handle_interrupts_loop() {
        let mut driver = TickDriver::new(&fast_config(), 0u64);
        let stop = driver.stop_handle();
        driver.add_action("stopper", move |n, _| {
            *n += 1;
            if *n == 5 {
                stop.stop();
            }
            Ok(())
        });

        driver.run();
        assert_eq!(*driver.state(), 5);
    }

    #[test]
    fn test_cadence_does_not_drift() {
        let mut driver = TickDriver::new(&TickConfig { tick_rate: 200 }, ());
        let start = Instant::now();
        driver.run_for(20);
        let elapsed = start.elapsed();

        // 20 ticks at 5ms, the last one does not wait for a successor
        assert!(elapsed >= Duration::from_millis(95), "{elapsed:?}");
        assert_eq!(driver.stats().total_ticks, 20);
    }
}
