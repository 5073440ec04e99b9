use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    Action, ActionMatcher, Config, Error, Middleware, Next, Result,
    ledger::{self, Ledger},
    waiter::{self, PendingWait, Until, WaiterRegistry},
};

struct SpyState<A> {
    ledger: Ledger<A>,
    waiters: WaiterRegistry<A>,
    // Recorded actions whose waits are not settled yet, with their sequence.
    backlog: VecDeque<(u64, Arc<A>)>,
    // Set while one dispatch is settling the backlog.
    draining: bool,
}

struct Shared<A> {
    state: Mutex<SpyState<A>>,
    config: Config,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Middleware that records every action passing through a dispatch pipeline.
///
/// Install one clone into the pipeline and keep another in the test. Clones
/// share the same ledger and waiters; every [`ActionSpy::new`] starts fresh.
///
/// The spy is a pure observer: it forwards each action to the next stage
/// first, untouched, and only then records it and resolves any matching
/// waits. Errors from later stages are returned as-is and the action is not
/// recorded.
///
/// Waits are settled one action at a time, in dispatch order. A dispatch that
/// arrives while another is settling, from another thread or from inside a
/// wait predicate, is recorded at once and settled by the dispatch already in
/// progress before that one returns. Predicates never run under the spy's
/// lock, so they may query the spy, register waits or dispatch again.
///
/// # Example
///
/// ```rust
/// use action_spy::{ActionSpy, StoreBuilder};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> action_spy::Result {
/// let spy = ActionSpy::<&'static str>::new();
/// let store = StoreBuilder::new(|n: &usize, _: &&'static str| n + 1, 0)
///     .with_middleware(spy.clone())
///     .build();
///
/// store.dispatch("START")?;
/// assert_eq!(spy.get_actions().len(), 1);
///
/// let pending = spy.until_next("STOP");
/// store.dispatch("STOP")?;
/// assert_eq!(*pending.await?, "STOP");
/// # Ok(())
/// # }
/// ```
pub struct ActionSpy<A: Action> {
    shared: Arc<Shared<A>>,
}

impl<A: Action> Clone for ActionSpy<A> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<A: Action> Default for ActionSpy<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Action> fmt::Debug for ActionSpy<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("ActionSpy")
            .field("actions", &state.ledger.len())
            .field("pending_waits", &state.waiters.len())
            .field("config", &self.shared.config)
            .finish()
    }
}

impl<A: Action> ActionSpy<A> {
    /// Create a spy with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a spy with a custom [`Config`].
    pub fn with_config(config: Config) -> Self {
        let state = SpyState {
            ledger: Ledger::with_capacity(config.ledger_capacity()),
            waiters: WaiterRegistry::new(),
            backlog: VecDeque::new(),
            draining: false,
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                config,
            }),
        }
    }

    /// Returns the configuration this spy was created with.
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    // ==================== Queries ====================

    /// Returns every recorded action in dispatch order.
    ///
    /// The vector is a copy; changing it does not affect the spy.
    pub fn get_actions(&self) -> Vec<Arc<A>> {
        lock(&self.shared.state).ledger.snapshot()
    }

    /// Returns the most recent recorded action matching `condition`.
    pub fn get_action(&self, condition: impl Into<ActionMatcher<A>>) -> Option<Arc<A>> {
        let matcher = condition.into();
        ledger::latest(&self.get_actions(), &matcher)
    }

    /// Returns every recorded action matching `condition`, oldest first.
    pub fn find_all(&self, condition: impl Into<ActionMatcher<A>>) -> Vec<Arc<A>> {
        let matcher = condition.into();
        ledger::matching(&self.get_actions(), &matcher)
    }

    /// Returns how many recorded actions match `condition`.
    pub fn count(&self, condition: impl Into<ActionMatcher<A>>) -> usize {
        self.find_all(condition).len()
    }

    /// Returns the number of recorded actions.
    pub fn len(&self) -> usize {
        lock(&self.shared.state).ledger.len()
    }

    /// Returns true if no action has been recorded since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of registered waits not yet resolved.
    pub fn pending_waits(&self) -> usize {
        lock(&self.shared.state).waiters.len()
    }

    /// Forget every recorded action.
    ///
    /// Pending waits stay registered and can only be resolved by actions
    /// dispatched afterwards.
    pub fn clear_actions(&self) {
        let discarded = lock(&self.shared.state).ledger.clear();
        tracing::debug!(discarded, "actions cleared");
    }

    // ==================== Waiting ====================

    /// Wait for a matching action, accepting one already recorded.
    ///
    /// If the ledger holds a match, the returned future is already resolved
    /// with the most recent one. Otherwise it behaves like
    /// [`until_next`](Self::until_next).
    ///
    /// A predicate that captures a clone of this spy keeps the spy alive for
    /// as long as its wait stays registered. If that wait never matches, the
    /// spy is never freed and [`Error::Detached`] is never reported; capture
    /// the data the predicate needs instead where possible.
    pub fn until(&self, condition: impl Into<ActionMatcher<A>>) -> Until<A> {
        let matcher = condition.into();
        let (mut recorded, mut seen) = {
            let state = lock(&self.shared.state);
            (state.ledger.snapshot(), state.ledger.appended())
        };
        loop {
            if let Some(action) = ledger::latest(&recorded, &matcher) {
                tracing::trace!(action_type = %action.action_type(), "wait satisfied from ledger");
                return Until::ready(action);
            }
            let mut state = lock(&self.shared.state);
            if state.ledger.appended() == seen {
                return self.register(&mut state, matcher);
            }
            // Recorded while the matcher ran: check just those before registering.
            recorded = state.ledger.since(seen);
            seen = state.ledger.appended();
        }
    }

    /// Wait for the next matching action dispatched after this call.
    ///
    /// Actions already recorded are ignored even if they match, including
    /// one whose waits are being settled when this is called.
    ///
    /// The same caveat about predicates capturing the spy applies as for
    /// [`until`](Self::until).
    pub fn until_next(&self, condition: impl Into<ActionMatcher<A>>) -> Until<A> {
        let mut state = lock(&self.shared.state);
        self.register(&mut state, condition.into())
    }

    fn register(&self, state: &mut SpyState<A>, matcher: ActionMatcher<A>) -> Until<A> {
        let (wait, rx) = PendingWait::new(matcher, state.ledger.appended());
        state.waiters.register(wait);
        tracing::debug!(pending = state.waiters.len(), "wait registered");
        Until::pending(rx, self.shared.config.wait_timeout())
    }

    // ==================== Interception ====================

    fn record(&self, action: Arc<A>) {
        {
            let mut state = lock(&self.shared.state);
            let seq = state.ledger.append(action.clone());
            tracing::trace!(
                action_type = %action.action_type(),
                seq,
                recorded = state.ledger.len(),
                "action recorded"
            );
            state.backlog.push_back((seq, action));
            if state.draining {
                return;
            }
            state.draining = true;
        }
        self.drain();
    }

    fn drain(&self) {
        loop {
            let (seq, action, waits) = {
                let mut state = lock(&self.shared.state);
                let Some((seq, action)) = state.backlog.pop_front() else {
                    state.draining = false;
                    return;
                };
                let waits = state.waiters.take();
                (seq, action, waits)
            };
            if !waits.is_empty() {
                self.settle(seq, &action, waits);
            }
        }
    }

    fn settle(&self, seq: u64, action: &Arc<A>, waits: Vec<PendingWait<A>>) {
        // Predicates run unlocked so they may call back into this spy.
        let split = waiter::partition(waits, seq, &**action);

        let pending = {
            let mut state = lock(&self.shared.state);
            state.waiters.restore(split.pending);
            state.waiters.len()
        };

        if !split.faulted.is_empty() {
            tracing::error!(
                action_type = %action.action_type(),
                faulted = split.faulted.len(),
                "wait predicate panicked, removing"
            );
            for wait in split.faulted {
                wait.fail(Error::MatcherPanicked);
            }
        }

        if split.matched.is_empty() {
            return;
        }
        let resolved = split.matched.len();
        for wait in split.matched {
            if !wait.resolve(action.clone()) {
                tracing::warn!(
                    action_type = %action.action_type(),
                    "wait resolved after its future was dropped"
                );
            }
        }
        tracing::debug!(
            action_type = %action.action_type(),
            resolved,
            pending,
            "waits resolved"
        );
    }
}

impl<A: Action> Middleware<A> for ActionSpy<A> {
    fn handle(&self, action: Arc<A>, next: Next<'_, A>) -> Result {
        next(action.clone())?;
        self.record(action);
        Ok(())
    }
}

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
impl<A: Action + serde::Serialize> ActionSpy<A> {
    /// Serialize the recorded actions as a JSON array, in dispatch order.
    pub fn to_json(&self) -> Result<String> {
        let actions = self.get_actions();
        let actions: Vec<&A> = actions.iter().map(Arc::as_ref).collect();
        Ok(serde_json::to_string(&actions)?)
    }
}
