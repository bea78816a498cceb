//! Adapters and the composer that stacks them around a handler.
//!
//! An [`Adapter`] turns one handler into another. [`adapt`] folds a slice of
//! adapters around a base handler so that the **first** adapter in the slice
//! is the **outermost** layer:
//!
//! ```text
//! adapt(base, &[a0, a1, a2])  ==  a0(a1(a2(base)))
//!
//! request  → a0 → a1 → a2 → base
//! response ← a0 ← a1 ← a2 ← base
//! ```
//!
//! The chain is built once at startup and never reordered.

use std::fmt;
use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler, boxed};

/// A transformation from one handler to another.
///
/// Cloning is cheap and shares the same transformation, so one adapter
/// (for example one registered response counter) can wrap many handlers.
#[derive(Clone)]
pub struct Adapter {
    name: &'static str,
    wrap: Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync>,
}

impl Adapter {
    /// Builds an adapter from a wrapping function. `name` is only used for
    /// `Debug` output.
    ///
    /// ```rust
    /// use plait::{Adapter, BoxedHandler};
    ///
    /// let passthrough = Adapter::new("passthrough", |inner: BoxedHandler| inner);
    /// ```
    pub fn new<F>(name: &'static str, wrap: F) -> Self
    where
        F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        Self { name, wrap: Arc::new(wrap) }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wraps `inner`.
    pub fn apply(&self, inner: BoxedHandler) -> BoxedHandler {
        (self.wrap)(inner)
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Adapter").field(&self.name).finish()
    }
}

/// Wraps `handler` with `adapters`, first adapter outermost.
///
/// With no adapters the result behaves exactly like `handler`.
pub fn adapt(handler: impl Handler, adapters: &[Adapter]) -> BoxedHandler {
    // Innermost first: the last adapter wraps the base handler.
    adapters
        .iter()
        .rev()
        .fold(boxed(handler), |inner, adapter| adapter.apply(inner))
}

/// Builder form of [`adapt`].
///
/// ```rust
/// use plait::{Chain, handler_fn, Request};
/// use plait::middleware::{notify, request_method};
///
/// async fn login(_req: Request) -> &'static str { "login" }
///
/// let app = Chain::new()
///     .with(notify())
///     .with(request_method(http::Method::GET))
///     .handler(handler_fn(login));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Chain {
    adapters: Vec<Adapter>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an adapter inside the ones already added.
    pub fn with(mut self, adapter: Adapter) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// Adapters in execution order, outermost first.
    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }

    /// Composes the chain around `handler`.
    pub fn handler(&self, handler: impl Handler) -> BoxedHandler {
        adapt(handler, &self.adapters)
    }
}
