//! # Invocation Queue
//!
//! The only door into the simulation thread. Other threads (UI, console,
//! admin tools) post closures; the driver drains them at a fixed point at the
//! start of every tick.

use crossbeam_channel::{unbounded, Receiver, Sender};

/// A deferred call against the simulation state.
pub type Invocation<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Receiving side, owned by the simulation thread.
pub struct InvocationQueue<S> {
    tx: Sender<Invocation<S>>,
    rx: Receiver<Invocation<S>>,
}

/// Cloneable posting side, safe to move to other threads.
pub struct Invoker<S> {
    tx: Sender<Invocation<S>>,
}

impl<S> Clone for Invoker<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> Invoker<S> {
    /// Posts a closure to run on the simulation thread.
    ///
    /// Returns false if the queue has been dropped.
    pub fn invoke(&self, f: impl FnOnce(&mut S) + Send + 'static) -> bool {
        self.tx.send(Box::new(f)).is_ok()
    }
}

impl<S> Default for InvocationQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> InvocationQueue<S> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Returns a posting handle.
    #[must_use]
    pub fn invoker(&self) -> Invoker<S> {
        Invoker {
            tx: self.tx.clone(),
        }
    }

    /// Number of pending invocations.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Runs the invocations that were pending when the drain started.
    ///
    /// Invocations posted while draining wait for the next drain. Returns the
    /// number of invocations run.
    pub fn drain(&self, state: &mut S) -> usize {
        let pending = self.rx.len();
        let mut ran = 0;
        for _ in 0..pending {
            let Ok(invocation) = self.rx.try_recv() else {
                break;
            };
            invocation(state);
            ran += 1;
        }
        ran
    }
}
