use std::sync::Arc;

use crate::{Action, Result};

/// Continuation that forwards an action to the rest of the pipeline.
pub type Next<'a, A> = &'a dyn Fn(Arc<A>) -> Result;

/// A stage in a dispatch pipeline.
///
/// The host calls [`handle`](Self::handle) once per dispatched action,
/// synchronously and in dispatch order, before the reducer runs. `next`
/// forwards the action to the following stage; whatever it returns should be
/// propagated.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use action_spy::{Action, Middleware, Next, Result};
///
/// struct Logger;
///
/// impl<A: Action> Middleware<A> for Logger {
///     fn handle(&self, action: Arc<A>, next: Next<'_, A>) -> Result {
///         println!("dispatching {}", action.action_type());
///         next(action)
///     }
/// }
/// ```
pub trait Middleware<A: Action>: Send + Sync {
    /// Process `action`, calling `next` to pass it further down the pipeline.
    fn handle(&self, action: Arc<A>, next: Next<'_, A>) -> Result;
}

impl<A: Action, M: Middleware<A> + ?Sized> Middleware<A> for Arc<M> {
    fn handle(&self, action: Arc<A>, next: Next<'_, A>) -> Result {
        (**self).handle(action, next)
    }
}
