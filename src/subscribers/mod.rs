//! # Event subscribers for the editor bus.
//!
//! This module provides the handler traits plugged into the
//! [`EventBus`](crate::EventBus), the subscription options and the built-in
//! [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Component ── emit(Event) ──► EventBus ──► snapshot of matching subscriptions
//!                                                 │
//!                                                 ├──► Subscribe::on_event(&Event)       (inline)
//!                                                 │
//!                                                 └──► [queue] ──► SubscribeAsync::on_event(&Event)
//!                                                                     │
//!                                                               ┌─────┴─────┬─────────┐
//!                                                               ▼           ▼         ▼
//!                                                            Outline     Preview   Custom
//! ```
//!
//! ## Handler types
//! - **Inline handlers** run before `emit` returns; keep them short.
//! - **Queued handlers** run on a per-subscription worker task in emit order.
//!
//! ## Implementing custom subscribers
//! ```rust
//! use tino_core::{Event, HandlerError, Subscribe, kinds};
//!
//! struct WordCounter;
//!
//! impl Subscribe for WordCounter {
//!     fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
//!         if let Some(text) = event.payload::<String>() {
//!             let _words = text.split_whitespace().count();
//!         }
//!         Ok(())
//!     }
//! }
//!
//! assert!(WordCounter.on_event(&Event::new(kinds::TEXT_CHANGED)).is_ok());
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;
pub(crate) mod table;
pub(crate) mod worker;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::{
    AsyncHandlerFn, HandlerFn, Ownership, Subscribe, SubscribeAsync, SubscribeOptions,
    SubscriptionId,
};
