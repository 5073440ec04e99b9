//! Match conditions for queries and waits.

use std::{fmt, sync::Arc};

use regex::Regex;

use crate::{Action, Result};

type MatchFn<A> = Arc<dyn Fn(&A) -> bool + Send + Sync>;

/// The three shapes a match condition can take.
///
/// Most callers never build a `Condition` directly: every spy method accepts
/// `impl Into<ActionMatcher<A>>`, so a `&str`, a `String`, a [`Regex`] or an
/// [`ActionMatcher`] can be passed as-is.
pub enum Condition<A> {
    /// Action type equals the given tag.
    ExactTag(String),
    /// Action type matches the compiled pattern.
    Pattern(Regex),
    /// Arbitrary predicate over the whole action.
    Predicate(MatchFn<A>),
}

impl<A> Condition<A> {
    /// Compile `pattern` into a [`Condition::Pattern`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`](crate::Error::InvalidPattern) if the
    /// pattern does not compile.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Condition::Pattern(Regex::new(pattern)?))
    }

    /// Wrap a predicate closure.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        Condition::Predicate(Arc::new(predicate))
    }
}

impl<A> fmt::Debug for Condition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::ExactTag(tag) => f.debug_tuple("ExactTag").field(tag).finish(),
            Condition::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A normalized match condition.
///
/// Whatever shape the condition started as, it ends up here as one shared
/// callable, used the same way by [`get_action`](crate::ActionSpy::get_action)
/// and by the waiter registry. Cloning is cheap.
///
/// # Example
///
/// ```rust
/// use action_spy::ActionMatcher;
///
/// let by_type: ActionMatcher<String> = "START".into();
/// assert!(by_type.matches(&"START".to_string()));
///
/// let by_len = ActionMatcher::by_action(|a: &String| a.len() > 3);
/// assert!(by_len.matches(&"STOP".to_string()));
/// ```
pub struct ActionMatcher<A> {
    matcher: MatchFn<A>,
}

impl<A> Clone for ActionMatcher<A> {
    fn clone(&self) -> Self {
        Self {
            matcher: self.matcher.clone(),
        }
    }
}

impl<A> fmt::Debug for ActionMatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionMatcher").finish_non_exhaustive()
    }
}

impl<A: Action> ActionMatcher<A> {
    /// Match actions whose type equals `tag`.
    pub fn by_type(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            matcher: Arc::new(move |action: &A| action.action_type() == tag.as_str()),
        }
    }

    /// Match actions whose type matches `pattern` anywhere (unanchored, like
    /// [`Regex::is_match`]).
    pub fn by_pattern(pattern: Regex) -> Self {
        Self {
            matcher: Arc::new(move |action: &A| pattern.is_match(&action.action_type())),
        }
    }
}

impl<A> ActionMatcher<A> {
    /// Match actions with a custom predicate. The predicate is used as-is.
    pub fn by_action<F>(predicate: F) -> Self
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        Self {
            matcher: Arc::new(predicate),
        }
    }

    /// Returns true if `action` satisfies this matcher.
    #[inline]
    pub fn matches(&self, action: &A) -> bool {
        (self.matcher)(action)
    }
}

impl<A: Action> From<Condition<A>> for ActionMatcher<A> {
    fn from(condition: Condition<A>) -> Self {
        match condition {
            Condition::ExactTag(tag) => ActionMatcher::by_type(tag),
            Condition::Pattern(re) => ActionMatcher::by_pattern(re),
            Condition::Predicate(matcher) => ActionMatcher { matcher },
        }
    }
}

impl<A: Action> From<&str> for ActionMatcher<A> {
    fn from(tag: &str) -> Self {
        ActionMatcher::by_type(tag)
    }
}

impl<A: Action> From<String> for ActionMatcher<A> {
    fn from(tag: String) -> Self {
        ActionMatcher::by_type(tag)
    }
}

impl<A: Action> From<Regex> for ActionMatcher<A> {
    fn from(pattern: Regex) -> Self {
        ActionMatcher::by_pattern(pattern)
    }
}

impl<A: Action> From<&Regex> for ActionMatcher<A> {
    fn from(pattern: &Regex) -> Self {
        ActionMatcher::by_pattern(pattern.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[derive(Debug)]
    struct Flow {
        kind: &'static str,
        step: u32,
    }

    impl Action for Flow {
        fn action_type(&self) -> Cow<'_, str> {
            Cow::Borrowed(self.kind)
        }
    }

    fn flow(kind: &'static str) -> Flow {
        Flow { kind, step: 0 }
    }

    #[test]
    fn tag_matcher_is_exact() {
        let matcher: ActionMatcher<Flow> = "START".into();
        assert!(matcher.matches(&flow("START")));
        assert!(!matcher.matches(&flow("STARTED")));
        assert!(!matcher.matches(&flow("start")));
    }

    #[test]
    fn pattern_matcher_tests_action_type() {
        let matcher: ActionMatcher<Flow> = Regex::new("^S").unwrap().into();
        assert!(matcher.matches(&flow("START")));
        assert!(matcher.matches(&flow("STOP")));
        assert!(!matcher.matches(&flow("RESUME")));
    }

    #[test]
    fn pattern_matcher_is_unanchored() {
        let matcher: ActionMatcher<Flow> = Regex::new("TO").unwrap().into();
        assert!(matcher.matches(&flow("STOP")));
    }

    #[test]
    fn predicate_sees_whole_action() {
        let matcher = ActionMatcher::by_action(|f: &Flow| f.step == 2);
        assert!(matcher.matches(&Flow { kind: "X", step: 2 }));
        assert!(!matcher.matches(&Flow { kind: "X", step: 1 }));
    }

    #[test]
    fn condition_variants_normalize() {
        let exact: ActionMatcher<Flow> = Condition::ExactTag("STOP".into()).into();
        let pattern: ActionMatcher<Flow> = Condition::pattern(".*").unwrap().into();
        let predicate: ActionMatcher<Flow> =
            Condition::predicate(|f: &Flow| f.kind.len() > 4).into();

        assert!(exact.matches(&flow("STOP")));
        assert!(pattern.matches(&flow("anything")));
        assert!(predicate.matches(&flow("START")));
        assert!(!predicate.matches(&flow("STOP")));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = Condition::<Flow>::pattern("[unclosed").unwrap_err();
        assert!(matches!(err, crate::Error::InvalidPattern(_)));
    }

    #[test]
    fn cloned_matcher_shares_predicate() {
        let matcher: ActionMatcher<Flow> = "START".into();
        let copy = matcher.clone();
        assert!(copy.matches(&flow("START")));
        assert!(Arc::ptr_eq(&matcher.matcher, &copy.matcher));
    }
}
