use std::sync::Arc;

use crate::ActionMatcher;

/// Ordered record of observed actions.
///
/// Append-only until cleared. Reads go through [`Ledger::snapshot`], a fresh
/// vector of `Arc<A>`, so callers never reach the internal storage and
/// matchers never run while the spy's lock is held.
#[derive(Debug)]
pub(crate) struct Ledger<A> {
    actions: Vec<Arc<A>>,
    capacity: usize,
    // Total appends ever made; never reset by `clear`.
    appended: u64,
}

impl<A> Ledger<A> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            actions: Vec::with_capacity(capacity),
            capacity,
            appended: 0,
        }
    }

    /// Appends `action` and returns its sequence number, starting at 1.
    #[inline]
    pub(crate) fn append(&mut self, action: Arc<A>) -> u64 {
        self.actions.push(action);
        self.appended += 1;
        self.appended
    }

    /// Sequence number of the last append, or 0 if nothing was ever appended.
    #[inline]
    pub(crate) fn appended(&self) -> u64 {
        self.appended
    }

    /// Actions appended after sequence number `seen` that are still held.
    pub(crate) fn since(&self, seen: u64) -> Vec<Arc<A>> {
        let newer = usize::try_from(self.appended.saturating_sub(seen)).unwrap_or(usize::MAX);
        let start = self.actions.len().saturating_sub(newer);
        self.actions[start..].to_vec()
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<A>> {
        self.actions.clone()
    }

    /// Empties the ledger and returns how many actions were discarded.
    pub(crate) fn clear(&mut self) -> usize {
        let discarded = self.actions.len();
        self.actions = Vec::with_capacity(self.capacity);
        discarded
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.actions.len()
    }
}

/// Most recent action in `actions` satisfying `matcher`.
pub(crate) fn latest<A>(actions: &[Arc<A>], matcher: &ActionMatcher<A>) -> Option<Arc<A>> {
    actions
        .iter()
        .rev()
        .find(|action| matcher.matches(action))
        .cloned()
}

/// Every action in `actions` satisfying `matcher`, in dispatch order.
pub(crate) fn matching<A>(actions: &[Arc<A>], matcher: &ActionMatcher<A>) -> Vec<Arc<A>> {
    actions
        .iter()
        .filter(|action| matcher.matches(action))
        .cloned()
        .collect()
}
