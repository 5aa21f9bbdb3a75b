use once_cell::sync::OnceCell;

enum State<V, E> {
    Ready(Result<V, E>),

    /// The leader panicked before publishing an outcome.
    Poisoned,
}

/// Per-key single-flight state.
///
/// A slot starts pending. Exactly one caller, the one that registered the slot
/// in the cache, runs the init function through `Slot::run`; everyone else
/// blocks in `Slot::wait` until the outcome is published. The outcome is
/// written once, before the cell is signaled, and never mutated afterwards, so
/// readers need nothing beyond the `OnceCell` itself.
pub(crate) struct Slot<V, E> {
    state: OnceCell<State<V, E>>,
}

/// Marks the slot poisoned if the leader unwinds out of the init function.
/// Without it, followers would wait forever on a cell nobody will set.
struct PoisonOnUnwind<'a, V, E> {
    state: &'a OnceCell<State<V, E>>,
    armed: bool,
}

impl<'a, V, E> Drop for PoisonOnUnwind<'a, V, E> {
    fn drop(&mut self) {
        if self.armed && self.state.set(State::Poisoned).is_ok() {
            tracing::error!("init function panicked, poisoning slot");
        }
    }
}

impl<V, E> Slot<V, E> {
    pub(crate) fn new() -> Self {
        Self {
            state: OnceCell::new(),
        }
    }

    /// Has the outcome (or poison) been published?
    pub(crate) fn is_ready(&self) -> bool {
        self.state.get().is_some()
    }
}

impl<V, E> Slot<V, E>
where
    V: Clone,
    E: Clone,
{
    /// Leader path. Must be called at most once per slot, and never with the
    /// cache lock held.
    pub(crate) fn run(&self, init: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        let mut guard = PoisonOnUnwind {
            state: &self.state,
            armed: true,
        };
        let outcome = init();
        guard.armed = false;

        if self.state.set(State::Ready(outcome)).is_err() {
            unreachable!("slot published twice");
        }
        tracing::trace!("published outcome");
        self.wait()
    }

    /// Follower path. Blocks until the leader publishes.
    ///
    /// # Panics
    ///
    /// Panics if the leader panicked while computing the outcome.
    pub(crate) fn wait(&self) -> Result<V, E> {
        match self.state.wait() {
            State::Ready(outcome) => outcome.clone(),
            State::Poisoned => panic!("init function for this key panicked"),
        }
    }
}
