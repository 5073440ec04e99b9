#![cfg_attr(docsrs, feature(doc_cfg))]
//! # action-spy
//!
//! A recording middleware for dispatch pipelines.
//!
//! Drop an [`ActionSpy`] into a store's middleware chain and it keeps an
//! ordered log of every action that passes, answers synchronous queries over
//! that log, and lets async test code await an action that may or may not
//! have been dispatched yet. It never filters, delays or changes an action.
//!
//! ## Quick Start
//!
//! ```rust
//! use action_spy::*;
//!
//! #[derive(Action, Debug)]
//! enum Player {
//!     Start,
//!     Stop,
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result {
//!     let spy = ActionSpy::<Player>::new();
//!     let store = StoreBuilder::new(|count: &u32, _: &Player| count + 1, 0)
//!         .with_middleware(spy.clone())
//!         .build();
//!
//!     store.dispatch(Player::Start)?;
//!     assert!(spy.get_action("Start").is_some());
//!
//!     let stop = spy.until_next("Stop");
//!     store.dispatch(Player::Stop)?;
//!     assert!(matches!(*stop.await?, Player::Stop));
//!     Ok(())
//! }
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Action`] | Trait for observed actions (use `#[derive(Action)]`) |
//! | [`ActionSpy`] | The recording middleware and its query/wait API |
//! | [`ActionMatcher`] | Normalized match condition (type, pattern or predicate) |
//! | [`Condition`] | The three shapes a match condition can take |
//! | [`Until`] | Future resolved by the first matching action |
//! | [`Middleware`] | Contract between a pipeline and its stages |
//! | [`Store`] | Minimal reference pipeline for tests and demos |
//!
//! ## Matching
//!
//! Every query and wait accepts `impl Into<ActionMatcher<A>>`:
//!
//! ```rust,ignore
//! spy.get_action("Start");                                   // exact action type
//! spy.get_action(Regex::new("^St")?);                        // pattern on action type
//! spy.get_action(ActionMatcher::by_action(|a| a.is_final())); // any predicate
//! ```
//!
//! ## Waiting
//!
//! - [`ActionSpy::until`] resolves immediately with the latest recorded match,
//!   or waits for the next one.
//! - [`ActionSpy::until_next`] ignores everything already recorded.
//!
//! Waits have no cancellation. [`Until::within`] (or
//! [`Config::with_wait_timeout`]) bounds how long the caller waits without
//! removing the registration.
//!
//! ## Features
//!
//! - **`macros`** (default) - `#[derive(Action)]`
//! - **`serde`** - JSON export of the ledger (`ActionSpy::to_json()`) and `Config` serialization

extern crate self as action_spy;

mod action;
mod config;
mod error;
mod ledger;
mod matcher;
mod middleware;
mod spy;
mod store;
mod waiter;

pub use action::Action;
pub use config::Config;
pub use error::Error;
pub use matcher::{ActionMatcher, Condition};
pub use middleware::{Middleware, Next};
pub use spy::ActionSpy;
pub use store::{Store, StoreBuilder};
pub use waiter::Until;

pub use regex::Regex;

#[cfg(feature = "macros")]
#[cfg_attr(docsrs, doc(cfg(feature = "macros")))]
pub use action_spy_macros::Action;

/// Convenience alias for `Result<T, action_spy::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
