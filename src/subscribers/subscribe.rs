//! # Subscriber traits and subscription options.
//!
//! [`Subscribe`] and [`SubscribeAsync`] are the extension points for plugging
//! event handlers into the [`EventBus`](crate::EventBus).
//!
//! - [`Subscribe`]: called **inline** on the emitting thread before `emit` returns.
//! - [`SubscribeAsync`]: called on a dedicated worker task fed by a bounded
//!   queue; `emit` only enqueues.
//!
//! ## Contract
//! - Inline handlers must be fast (no blocking I/O); offload long work and
//!   publish a follow-up event when done.
//! - A handler error or panic is captured by the bus and never reaches the
//!   publisher nor the remaining subscribers.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tino_core::{Event, EventBus, HandlerError, HandlerFn, SubscribeOptions, kinds};
//!
//! let bus = EventBus::default();
//! let printer = HandlerFn::arc("printer", |ev: &Event| {
//!     let _ = ev.kind;
//!     Ok::<_, HandlerError>(())
//! });
//!
//! let id = bus.subscribe(kinds::FILE, printer, SubscribeOptions::default());
//! assert_eq!(bus.emit(Event::new(kinds::FILE_SAVED)), 1);
//! assert!(bus.unsubscribe(id));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::events::Event;

/// Contract for inline (synchronous) event handlers.
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    fn on_event(&self, event: &Event) -> Result<(), HandlerError>;

    /// Human-readable name (for logs and failure records).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Contract for queued (asynchronous) event handlers.
///
/// Called from a subscription-dedicated worker task. Events are handled one at
/// a time in emit order.
#[async_trait]
pub trait SubscribeAsync: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event) -> Result<(), HandlerError>;

    /// Human-readable name (for logs and failure records).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// How the bus holds on to a handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ownership {
    /// The subscription keeps the handler alive until unsubscribed.
    #[default]
    Strong,
    /// The bus holds a non-owning reference; the subscription is dropped
    /// silently once every other owner has released the handler.
    Weak,
}

/// Per-subscription options.
#[derive(Debug, Clone, Default)]
pub struct SubscribeOptions {
    /// Strong or weak handler ownership.
    pub ownership: Ownership,
    /// Optional owner label, used by [`EventBus::unsubscribe_owner`](crate::EventBus::unsubscribe_owner).
    pub owner: Option<Arc<str>>,
}

impl SubscribeOptions {
    /// Holds the handler weakly.
    pub fn weak(mut self) -> Self {
        self.ownership = Ownership::Weak;
        self
    }

    /// Tags the subscription with an owner label.
    pub fn owned_by(mut self, owner: impl Into<Arc<str>>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

/// Handle returned by `subscribe`; pass it to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    /// Raw id; ids grow in subscription order.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// Closure-backed inline handler.
///
/// ```rust
/// use tino_core::{Event, HandlerError, HandlerFn, Subscribe, kinds};
///
/// let h = HandlerFn::new("noop", |_ev: &Event| Ok::<_, HandlerError>(()));
/// assert_eq!(h.name(), "noop");
/// assert!(h.on_event(&Event::new(kinds::FILE_OPENED)).is_ok());
/// ```
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F>
where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately subscribe it.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> Subscribe for HandlerFn<F>
where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        (self.f)(event)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Closure-backed queued handler.
///
/// The closure receives an owned [`Event`] clone and returns a fresh future
/// per event, so no state leaks between invocations.
pub struct AsyncHandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut> AsyncHandlerFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    /// Creates a new function-backed queued handler.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> SubscribeAsync for AsyncHandlerFn<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        (self.f)(event.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::kinds;

    struct Named;

    impl Subscribe for Named {
        fn on_event(&self, _event: &Event) -> Result<(), HandlerError> {
            Err(HandlerError::fail("nope"))
        }
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert!(Named.name().ends_with("Named"));
        assert!(Named.on_event(&Event::new(kinds::FILE)).is_err());
    }

    #[test]
    fn test_options_builders() {
        let opts = SubscribeOptions::default().weak().owned_by("editor");
        assert_eq!(opts.ownership, Ownership::Weak);
        assert_eq!(opts.owner.as_deref(), Some("editor"));
        assert_eq!(SubscribeOptions::default().ownership, Ownership::Strong);
    }

    #[tokio::test]
    async fn test_async_handler_fn_runs_closure() {
        let h = AsyncHandlerFn::new("async", |ev: Event| async move {
            if ev.is(&kinds::FILE) {
                Ok(())
            } else {
                Err(HandlerError::fail("unexpected kind"))
            }
        });
        assert_eq!(SubscribeAsync::name(&h), "async");
        assert!(h.on_event(&Event::new(kinds::FILE_SAVED)).await.is_ok());
        assert!(h.on_event(&Event::new(kinds::CURSOR_MOVED)).await.is_err());
    }
}
