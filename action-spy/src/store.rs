use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use crate::{Action, Middleware, Result};

type Reducer<S, A> = Box<dyn Fn(&S, &A) -> S + Send + Sync>;

/// Builder for a [`Store`].
///
/// # Example
///
/// ```rust
/// use action_spy::{ActionSpy, StoreBuilder};
///
/// let spy = ActionSpy::<String>::new();
/// let store = StoreBuilder::new(|log: &Vec<String>, a: &String| {
///         let mut log = log.clone();
///         log.push(a.clone());
///         log
///     }, Vec::new())
///     .with_init("@@INIT".to_string())
///     .with_middleware(spy.clone())
///     .build();
///
/// store.dispatch("START".to_string()).unwrap();
///
/// assert_eq!(store.state(), ["@@INIT", "START"]);
/// assert_eq!(spy.get_actions().len(), 1);
/// ```
pub struct StoreBuilder<S, A: Action> {
    reducer: Reducer<S, A>,
    state: S,
    init: Option<A>,
    middleware: Vec<Arc<dyn Middleware<A>>>,
}

impl<S, A: Action> StoreBuilder<S, A> {
    /// Start a store from a reducer and its initial state.
    pub fn new<R>(reducer: R, initial_state: S) -> Self
    where
        R: Fn(&S, &A) -> S + Send + Sync + 'static,
    {
        Self {
            reducer: Box::new(reducer),
            state: initial_state,
            init: None,
            middleware: Vec::new(),
        }
    }

    /// Bootstrap action applied to the reducer when the store is built,
    /// before any middleware sees a dispatch.
    pub fn with_init(mut self, action: A) -> Self {
        self.init = Some(action);
        self
    }

    /// Append a middleware. Middleware run in the order they were added.
    pub fn with_middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<A> + 'static,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Apply the init action, if any, and assemble the store.
    pub fn build(self) -> Store<S, A> {
        let state = match &self.init {
            Some(init) => (self.reducer)(&self.state, init),
            None => self.state,
        };
        Store {
            state: Mutex::new(state),
            reducer: self.reducer,
            middleware: self.middleware,
        }
    }
}

/// A minimal dispatch pipeline: a middleware chain in front of a reducer.
///
/// `dispatch` hands the action to the first middleware, each middleware
/// forwards it with `next`, and the reducer runs once the chain is exhausted.
/// Share it behind an `Arc` to dispatch from other tasks.
pub struct Store<S, A: Action> {
    state: Mutex<S>,
    reducer: Reducer<S, A>,
    middleware: Vec<Arc<dyn Middleware<A>>>,
}

impl<S, A: Action> Store<S, A> {
    /// Dispatch `action` and return it as recorded by the pipeline.
    pub fn dispatch(&self, action: A) -> Result<Arc<A>> {
        let action = Arc::new(action);
        self.dispatch_shared(action.clone())?;
        Ok(action)
    }

    /// Dispatch an action that is already shared.
    pub fn dispatch_shared(&self, action: Arc<A>) -> Result {
        self.run(0, action)
    }

    fn run(&self, index: usize, action: Arc<A>) -> Result {
        match self.middleware.get(index) {
            Some(middleware) => {
                middleware.handle(action, &|next: Arc<A>| self.run(index + 1, next))
            }
            None => {
                self.reduce(&action);
                Ok(())
            }
        }
    }

    fn reduce(&self, action: &A) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = (self.reducer)(&state, action);
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> S
    where
        S: Clone,
    {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<S: fmt::Debug, A: Action> fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{ActionSpy, Error, Next};

    fn log_reducer(log: &Vec<&'static str>, action: &&'static str) -> Vec<&'static str> {
        let mut log = log.clone();
        log.push(*action);
        log
    }

    struct Counter(Arc<AtomicUsize>);

    impl<A: Action> Middleware<A> for Counter {
        fn handle(&self, action: Arc<A>, next: Next<'_, A>) -> Result {
            self.0.fetch_add(1, Ordering::SeqCst);
            next(action)
        }
    }

    struct Blocker;

    impl Middleware<&'static str> for Blocker {
        fn handle(&self, action: Arc<&'static str>, next: Next<'_, &'static str>) -> Result {
            if *action == "FORBIDDEN" {
                return Err(Error::downstream(std::io::Error::other("forbidden")));
            }
            next(action)
        }
    }

    #[test]
    fn reducer_sees_every_action() {
        let store = StoreBuilder::new(log_reducer, Vec::new()).build();
        store.dispatch("START").unwrap();
        store.dispatch("STOP").unwrap();
        assert_eq!(store.state(), ["START", "STOP"]);
    }

    #[test]
    fn init_action_bypasses_middleware() {
        let spy = ActionSpy::<&'static str>::new();
        let store = StoreBuilder::new(log_reducer, Vec::new())
            .with_init("@@INIT")
            .with_middleware(spy.clone())
            .build();

        store.dispatch("START").unwrap();

        assert_eq!(store.state(), ["@@INIT", "START"]);
        assert!(spy.get_action("@@INIT").is_none());
        assert_eq!(spy.len(), 1);
    }

    #[test]
    fn every_middleware_sees_the_action() {
        let seen = Arc::new(AtomicUsize::new(0));
        let spy = ActionSpy::<&'static str>::new();
        let store = StoreBuilder::new(log_reducer, Vec::new())
            .with_middleware(Arc::new(Counter(seen.clone())))
            .with_middleware(spy.clone())
            .build();

        store.dispatch("START").unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(spy.len(), 1);
    }

    #[test]
    fn dispatch_returns_the_recorded_instance() {
        let spy = ActionSpy::<&'static str>::new();
        let store = StoreBuilder::new(log_reducer, Vec::new())
            .with_middleware(spy.clone())
            .build();

        let start = store.dispatch("START").unwrap();
        assert!(Arc::ptr_eq(&spy.get_action("START").unwrap(), &start));
    }

    #[test]
    fn failure_after_spy_propagates_and_is_not_recorded() {
        let spy = ActionSpy::<&'static str>::new();
        let store = StoreBuilder::new(log_reducer, Vec::new())
            .with_middleware(spy.clone())
            .with_middleware(Blocker)
            .build();

        let err = store.dispatch("FORBIDDEN").unwrap_err();
        assert!(matches!(err, Error::Downstream(_)));
        assert!(spy.is_empty());
        assert!(store.state().is_empty());
    }

    #[test]
    fn failure_before_spy_never_reaches_it() {
        let spy = ActionSpy::<&'static str>::new();
        let store = StoreBuilder::new(log_reducer, Vec::new())
            .with_middleware(Blocker)
            .with_middleware(spy.clone())
            .build();

        assert!(store.dispatch("FORBIDDEN").is_err());
        store.dispatch("START").unwrap();
        assert_eq!(spy.len(), 1);
    }
}
