use std::{
    fmt,
    future::Future,
    panic::{AssertUnwindSafe, catch_unwind},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use tokio::{sync::oneshot, time::Sleep};

use crate::{ActionMatcher, Error, Result};

type Completion<A> = oneshot::Sender<Result<Arc<A>>>;
type CompletionReceiver<A> = oneshot::Receiver<Result<Arc<A>>>;

/// A registered request for a future matching action.
pub(crate) struct PendingWait<A> {
    matcher: ActionMatcher<A>,
    completion: Completion<A>,
    // Ledger sequence at registration; only later actions are considered.
    since: u64,
}

impl<A> PendingWait<A> {
    pub(crate) fn new(matcher: ActionMatcher<A>, since: u64) -> (Self, CompletionReceiver<A>) {
        let (completion, rx) = oneshot::channel();
        (
            Self {
                matcher,
                completion,
                since,
            },
            rx,
        )
    }

    /// Returns true if the action appended as `seq` came after this wait.
    #[inline]
    pub(crate) fn observes(&self, seq: u64) -> bool {
        seq > self.since
    }

    #[inline]
    pub(crate) fn matches(&self, action: &A) -> bool {
        self.matcher.matches(action)
    }

    /// Fire the completion. Consumes the wait so it can only happen once.
    ///
    /// Returns false if nobody is listening anymore.
    pub(crate) fn resolve(self, action: Arc<A>) -> bool {
        self.completion.send(Ok(action)).is_ok()
    }

    /// Complete the wait with an error instead of an action.
    pub(crate) fn fail(self, error: Error) -> bool {
        self.completion.send(Err(error)).is_ok()
    }
}

/// The set of outstanding waits owned by one spy.
pub(crate) struct WaiterRegistry<A> {
    waits: Vec<PendingWait<A>>,
}

impl<A> WaiterRegistry<A> {
    pub(crate) fn new() -> Self {
        Self { waits: Vec::new() }
    }

    pub(crate) fn register(&mut self, wait: PendingWait<A>) {
        self.waits.push(wait);
    }

    /// Move every wait out, leaving the registry empty.
    pub(crate) fn take(&mut self) -> Vec<PendingWait<A>> {
        std::mem::take(&mut self.waits)
    }

    /// Put back waits that did not match, ahead of any registered meanwhile.
    pub(crate) fn restore(&mut self, mut survivors: Vec<PendingWait<A>>) {
        survivors.append(&mut self.waits);
        self.waits = survivors;
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.waits.len()
    }
}

/// Outcome of testing every pending wait against one action.
pub(crate) struct Partition<A> {
    pub(crate) matched: Vec<PendingWait<A>>,
    pub(crate) pending: Vec<PendingWait<A>>,
    pub(crate) faulted: Vec<PendingWait<A>>,
}

/// Split `waits` into those satisfied by `action` (appended as `seq`), those
/// still pending, and those whose predicate panicked.
///
/// Waits registered after `seq` was appended stay pending without running
/// their matcher.
pub(crate) fn partition<A>(waits: Vec<PendingWait<A>>, seq: u64, action: &A) -> Partition<A> {
    let mut partition = Partition {
        matched: Vec::new(),
        pending: Vec::with_capacity(waits.len()),
        faulted: Vec::new(),
    };
    for wait in waits {
        if !wait.observes(seq) {
            partition.pending.push(wait);
            continue;
        }
        match catch_unwind(AssertUnwindSafe(|| wait.matches(action))) {
            Ok(true) => partition.matched.push(wait),
            Ok(false) => partition.pending.push(wait),
            Err(_) => partition.faulted.push(wait),
        }
    }
    partition
}

enum UntilState<A> {
    Ready(Option<Arc<A>>),
    Pending(CompletionReceiver<A>),
}

/// Future returned by [`until`](crate::ActionSpy::until) and
/// [`until_next`](crate::ActionSpy::until_next).
///
/// Resolves with the matching action, the same `Arc` the spy recorded.
/// Dropping it does not unregister the wait; the spy simply discards the
/// result when a matching action arrives.
///
/// # Example
///
/// ```ignore
/// let login = spy.until_next("Login").within(Duration::from_secs(1)).await?;
/// ```
#[must_use = "futures do nothing unless awaited"]
pub struct Until<A> {
    state: UntilState<A>,
    timeout: Option<Duration>,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl<A> Until<A> {
    pub(crate) fn ready(action: Arc<A>) -> Self {
        Self {
            state: UntilState::Ready(Some(action)),
            timeout: None,
            sleep: None,
        }
    }

    pub(crate) fn pending(rx: CompletionReceiver<A>, timeout: Option<Duration>) -> Self {
        Self {
            state: UntilState::Pending(rx),
            timeout,
            sleep: None,
        }
    }

    /// Fail with [`Error::Timeout`] if no matching action arrives within
    /// `timeout`. An already resolved future is unaffected.
    ///
    /// # Panics
    ///
    /// Polling a pending future with a timeout panics outside a Tokio runtime
    /// with the time driver enabled.
    pub fn within(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.sleep = None;
        self
    }

    /// Returns true if this future was created already resolved, from an
    /// action found in the ledger.
    pub fn is_immediate(&self) -> bool {
        matches!(self.state, UntilState::Ready(_))
    }
}

impl<A> Future for Until<A> {
    type Output = Result<Arc<A>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let rx = match &mut this.state {
            UntilState::Ready(action) => {
                return Poll::Ready(action.take().ok_or(Error::Detached));
            }
            UntilState::Pending(rx) => rx,
        };

        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(result)) => return Poll::Ready(result),
            Poll::Ready(Err(_)) => return Poll::Ready(Err(Error::Detached)),
            Poll::Pending => {}
        }

        let Some(timeout) = this.timeout else {
            return Poll::Pending;
        };
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
        match sleep.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(Err(Error::Timeout(timeout))),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<A> fmt::Debug for Until<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Until")
            .field("immediate", &self.is_immediate())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::FutureExt;

    use super::*;

    fn wait_for(tag: &'static str) -> (PendingWait<&'static str>, Until<&'static str>) {
        let (wait, rx) = PendingWait::new(tag.into(), 0);
        (wait, Until::pending(rx, None))
    }

    #[test]
    fn partition_splits_by_match() {
        let (start, _a) = wait_for("START");
        let (stop, _b) = wait_for("STOP");
        let (also_start, _c) = wait_for("START");

        let split = partition(vec![start, stop, also_start], 1, &"START");
        assert_eq!(split.matched.len(), 2);
        assert_eq!(split.pending.len(), 1);
        assert!(split.faulted.is_empty());
    }

    #[tokio::test]
    async fn panicking_predicate_is_faulted() {
        let (wait, rx) = PendingWait::new(
            ActionMatcher::by_action(|_: &&'static str| panic!("predicate bug")),
            0,
        );
        let until = Until::pending(rx, None);

        let split = partition(vec![wait], 1, &"START");
        assert_eq!(split.faulted.len(), 1);
        for wait in split.faulted {
            assert!(wait.fail(Error::MatcherPanicked));
        }
        assert_eq!(until.await.unwrap_err(), Error::MatcherPanicked);
    }

    #[test]
    fn partition_skips_actions_older_than_the_wait() {
        let (wait, rx) = PendingWait::new(
            ActionMatcher::by_action(|_: &&'static str| panic!("never evaluated")),
            3,
        );
        let _until = Until::pending(rx, None);

        let split = partition(vec![wait], 3, &"START");
        assert_eq!(split.pending.len(), 1);
        assert!(split.matched.is_empty());
        assert!(split.faulted.is_empty());
    }

    #[test]
    fn restore_keeps_survivors_ahead_of_newcomers() {
        let mut registry = WaiterRegistry::new();
        let (first, _a) = wait_for("A");
        registry.register(first);

        let taken = registry.take();
        assert_eq!(registry.len(), 0);

        let (newcomer, _b) = wait_for("B");
        registry.register(newcomer);
        registry.restore(taken);

        assert_eq!(registry.len(), 2);
        assert!(registry.waits[0].matches(&"A"));
        assert!(registry.waits[1].matches(&"B"));
    }

    #[tokio::test]
    async fn resolved_wait_completes_future() {
        let (wait, until) = wait_for("START");
        let action = Arc::new("START");
        assert!(wait.resolve(action.clone()));

        let got = until.await.unwrap();
        assert!(Arc::ptr_eq(&got, &action));
    }

    #[test]
    fn resolve_reports_dropped_listener() {
        let (wait, until) = wait_for("START");
        drop(until);
        assert!(!wait.resolve(Arc::new("START")));
    }

    #[test]
    fn unresolved_future_stays_pending() {
        let (_wait, mut until) = wait_for("START");
        assert!(!until.is_immediate());
        assert!((&mut until).now_or_never().is_none());
    }

    #[tokio::test]
    async fn dropped_wait_detaches_future() {
        let (wait, until) = wait_for("START");
        drop(wait);
        assert_eq!(until.await.unwrap_err(), Error::Detached);
    }

    #[tokio::test]
    async fn ready_future_resolves_immediately() {
        let action = Arc::new("STOP");
        let until = Until::ready(action.clone());
        assert!(until.is_immediate());
        assert!(Arc::ptr_eq(&until.await.unwrap(), &action));
    }

    #[tokio::test(start_paused = true)]
    async fn within_times_out() {
        let (_wait, until) = wait_for("START");
        let err = until.within(Duration::from_millis(50)).await.unwrap_err();
        assert_eq!(err, Error::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn within_does_not_affect_ready_future() {
        let until = Until::ready(Arc::new("STOP")).within(Duration::ZERO);
        assert_eq!(*until.await.unwrap(), "STOP");
    }
}
