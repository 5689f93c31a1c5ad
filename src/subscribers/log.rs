//! # Logging subscriber for debugging and demos.
//!
//! [`LogWriter`] turns every event into a `tracing` record on the
//! `tino_core::events` target. Payloads published by the bus and the registry
//! are rendered as fields; other payloads are only flagged as present.
//!
//! ## Output format (with `tracing_subscriber::fmt`)
//! ```text
//! INFO tino_core::events: event kind=file.saved seq=3 source=file_manager payload=true
//! INFO tino_core::events: component loaded name=editor type=app::Editor elapsed_us=18
//! WARN tino_core::events: handler failed handler=outline kind=editor.text_changed seq=7 error=handler failed: stale tree
//! ```
//!
//! ## Example
//! ```rust
//! # use tino_core::{EventBus, LogWriter};
//! let bus = EventBus::default();
//! let id = LogWriter::attach(&bus);
//! assert!(bus.unsubscribe(id));
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::HandlerError;
use crate::events::{Event, EventBus, HandlerFailure, SubscriberOverflow, kinds};
use crate::registry::{ComponentLoaded, ComponentUnloaded};
use crate::subscribers::{Subscribe, SubscribeOptions, SubscriptionId};

/// Logs every event it receives through `tracing`.
///
/// Enabled via the `logging` feature. For structured metrics implement a
/// custom [`Subscribe`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

impl LogWriter {
    /// Subscribes a `LogWriter` to every event on `bus`.
    pub fn attach(bus: &EventBus) -> SubscriptionId {
        bus.subscribe(
            kinds::EVENT,
            Arc::new(LogWriter),
            SubscribeOptions::default().owned_by("log_writer"),
        )
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) -> Result<(), HandlerError> {
        if let Some(f) = e.payload::<HandlerFailure>() {
            warn!(
                target: "tino_core::events",
                handler = %f.handler, kind = %f.kind, seq = f.seq, error = %f.error,
                "handler failed"
            );
        } else if let Some(o) = e.payload::<SubscriberOverflow>() {
            warn!(
                target: "tino_core::events",
                handler = %o.handler, kind = %o.kind, seq = o.seq,
                "subscriber overflow"
            );
        } else if let Some(c) = e.payload::<ComponentLoaded>() {
            info!(
                target: "tino_core::events",
                name = %c.name, type_name = c.type_name,
                elapsed_us = c.elapsed.as_micros() as u64,
                "component loaded"
            );
        } else if let Some(c) = e.payload::<ComponentUnloaded>() {
            match &c.error {
                Some(err) => warn!(
                    target: "tino_core::events",
                    name = %c.name, error = %err,
                    "component unloaded with teardown failure"
                ),
                None => info!(
                    target: "tino_core::events",
                    name = %c.name, elapsed_us = c.elapsed.as_micros() as u64,
                    "component unloaded"
                ),
            }
        } else {
            info!(
                target: "tino_core::events",
                kind = %e.kind, seq = e.seq, source = %e.source, payload = e.has_payload(),
                "event"
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log_writer"
    }
}
