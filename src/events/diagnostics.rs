//! Payloads of the `bus.*` diagnostic events.

use std::sync::Arc;
use std::time::SystemTime;

use super::kind::EventKind;
use crate::error::HandlerError;
use crate::subscribers::SubscriptionId;

/// Source identifier used for events published by the bus itself.
pub const BUS_SOURCE: &str = "event_bus";

/// A handler failed while processing an event.
///
/// Recorded in the bus failure log and published as `bus.handler_failed`.
#[derive(Debug, Clone)]
pub struct HandlerFailure {
    /// Subscription whose handler failed.
    pub subscription: SubscriptionId,
    /// Handler name.
    pub handler: Arc<str>,
    /// Kind of the event being handled.
    pub kind: EventKind,
    /// Sequence number of the event being handled.
    pub seq: u64,
    /// What went wrong.
    pub error: HandlerError,
    /// When the failure was captured.
    pub at: SystemTime,
}

/// An event was dropped for one queued subscription.
///
/// Published as `bus.subscriber_overflow`.
#[derive(Debug, Clone)]
pub struct SubscriberOverflow {
    /// Subscription that missed the event.
    pub subscription: SubscriptionId,
    /// Handler name.
    pub handler: Arc<str>,
    /// Kind of the dropped event.
    pub kind: EventKind,
    /// Sequence number of the dropped event.
    pub seq: u64,
}
