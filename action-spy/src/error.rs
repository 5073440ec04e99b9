use std::{sync::Arc, time::Duration};

/// The single error type for all action-spy operations.
///
/// Every fallible API returns `action_spy::Result<T>` (alias for
/// `Result<T, action_spy::Error>`). Failures raised by other pipeline
/// stages travel through the spy as [`Error::Downstream`] without being
/// inspected or rewrapped.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("no matching action observed within {0:?}")]
    Timeout(Duration),

    #[error("spy was dropped before a matching action was observed")]
    Detached,

    #[error("match predicate panicked while inspecting an action")]
    MatcherPanicked,

    #[error("invalid action type pattern: {0}")]
    InvalidPattern(String),

    #[error("downstream stage failed: {0}")]
    Downstream(#[source] Arc<dyn std::error::Error + Send + Sync>),

    #[cfg(feature = "serde")]
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl Error {
    /// Wrap a failure raised by a later pipeline stage (another middleware or
    /// the reducer host).
    pub fn downstream(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Downstream(Arc::new(e))
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::Detached, Self::Detached) => true,
            (Self::MatcherPanicked, Self::MatcherPanicked) => true,
            (Self::InvalidPattern(a), Self::InvalidPattern(b)) => a == b,
            (Self::Downstream(a), Self::Downstream(b)) => Arc::ptr_eq(a, b),
            #[cfg(feature = "serde")]
            (Self::Serialization(a), Self::Serialization(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Error {}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::InvalidPattern(e.to_string())
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("reducer exploded")]
    struct Boom;

    #[test]
    fn downstream_errors_compare_by_identity() {
        let a = Error::downstream(Boom);
        let b = Error::downstream(Boom);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn downstream_error_keeps_source_message() {
        let e = Error::downstream(Boom);
        assert_eq!(e.to_string(), "downstream stage failed: reducer exploded");
    }

    #[test]
    fn regex_error_becomes_invalid_pattern() {
        let e: Error = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(e, Error::InvalidPattern(_)));
    }
}
