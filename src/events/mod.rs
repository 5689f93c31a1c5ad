//! Editor events: kinds, events and the publish/subscribe bus.
//!
//! ## Contents
//! - [`EventKind`] and the [`kinds`] vocabulary: a single-inheritance taxonomy
//! - [`Event`] immutable notification with an optional typed payload
//! - [`EventBus`] kind-routed delivery with history and failure capture
//! - [`HandlerFailure`], [`SubscriberOverflow`] payloads of the `bus.*` diagnostics
//!
//! ## Quick reference
//! - **Publishers**: any component holding a bus clone, the component
//!   registry (`component.*`) and the bus itself (`bus.*`).
//! - **Consumers**: [`Subscribe`](crate::Subscribe) and
//!   [`SubscribeAsync`](crate::SubscribeAsync) implementations.

pub(crate) mod bus;
mod diagnostics;
mod event;
mod history;
mod kind;

pub use bus::EventBus;
pub use diagnostics::{BUS_SOURCE, HandlerFailure, SubscriberOverflow};
pub use event::{Event, UNKNOWN_SOURCE};
pub use kind::{Ancestry, EventKind, kinds};
