use std::time::Duration;

/// Per-spy configuration.
///
/// Use the builder methods to customize, or [`Default`] for sensible defaults.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use action_spy::Config;
///
/// let config = Config::default()
///     .with_ledger_capacity(256)                    // Fewer reallocations for chatty stores
///     .with_wait_timeout(Duration::from_secs(2));   // Bound every `until`/`until_next`
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Initial capacity of the action ledger, restored on every clear.
    /// Default: 64
    ledger_capacity: usize,

    /// Upper bound applied to every wait future the spy hands out.
    /// `None` waits until a matching action arrives.
    /// Default: `None`
    wait_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ledger_capacity: 64,
            wait_timeout: None,
        }
    }
}

impl Config {
    /// Set the initial ledger capacity.
    pub fn with_ledger_capacity(mut self, capacity: usize) -> Self {
        self.ledger_capacity = capacity;
        self
    }

    /// Returns the initial ledger capacity.
    pub fn ledger_capacity(&self) -> usize {
        self.ledger_capacity
    }

    /// Bound every wait created by the spy.
    ///
    /// A wait that exceeds the bound yields
    /// [`Error::Timeout`](crate::Error::Timeout). The registration itself is
    /// left in place. Individual futures can still override it with
    /// [`Until::within`](crate::Until::within).
    ///
    /// # Panics
    ///
    /// Awaiting a pending wait with a bound panics outside a Tokio runtime
    /// with the time driver enabled.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    /// Returns the default wait bound, if any.
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout
    }
}
