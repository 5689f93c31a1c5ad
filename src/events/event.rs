//! # Events published on the bus.
//!
//! An [`Event`] is an immutable record: kind, timestamp, source component and
//! an optional typed payload. It is assembled with `with_*` builders and then
//! handed to [`EventBus::emit`](crate::EventBus::emit), which wraps it in an
//! `Arc` and never mutates it again.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use tino_core::{Event, kinds};
//!
//! #[derive(Debug, PartialEq)]
//! struct Saved { path: String, bytes: usize }
//!
//! let ev = Event::new(kinds::FILE_SAVED)
//!     .with_source("file_manager")
//!     .with_payload(Saved { path: "notes.md".into(), bytes: 42 });
//!
//! assert_eq!(ev.kind, kinds::FILE_SAVED);
//! assert_eq!(&*ev.source, "file_manager");
//! assert_eq!(ev.payload::<Saved>().map(|s| s.bytes), Some(42));
//! assert!(ev.payload::<String>().is_none());
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use super::kind::EventKind;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Default `source` for events that do not name their publisher.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Bus event with an optional typed payload.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `source`: opaque identifier of the publishing component
#[derive(Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Component that emitted the event.
    pub source: Arc<str>,

    payload: Option<Arc<dyn Any + Send + Sync>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: Arc::from(UNKNOWN_SOURCE),
            payload: None,
        }
    }

    /// Attaches the publishing component's identifier.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = source.into();
        self
    }

    /// Attaches a typed payload.
    #[inline]
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// Attaches an already shared payload.
    #[inline]
    pub fn with_shared_payload<T: Any + Send + Sync>(mut self, payload: Arc<T>) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Borrows the payload if it is a `T`.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref::<T>()
    }

    /// Returns `true` if a payload is attached.
    #[inline]
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Returns `true` if this event's kind is `kind` or refines it.
    #[inline]
    pub fn is(&self, kind: &EventKind) -> bool {
        self.kind.is_a(kind)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("seq", &self.seq)
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}
