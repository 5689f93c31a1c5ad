//! # Queued delivery worker.
//!
//! Every queued subscription gets its own bounded queue and worker task, so a
//! slow handler never blocks `emit` callers nor other subscriptions.
//!
//! ## Architecture
//! ```text
//! emit(event)
//!     │
//!     ├──► [queue 1] ──► worker 1 ──► handler1.on_event()
//!     │    (bounded)         └──────► error/panic → HandlerFailure
//!     ├──► [queue 2] ──► worker 2 ──► handler2.on_event()
//!     │    (bounded)
//!     └──► [queue N] ──► worker N ──► handlerN.on_event()
//! ```
//!
//! ## Rules
//! - **Per-subscription FIFO**: each handler sees its events in emit order.
//! - **No cross-subscription ordering**: handler A may process event N while B processes N+5.
//! - **Isolation**: errors and panics are recorded; the worker continues with the next event.
//! - **Weak handlers**: the worker exits once the handler is gone.
//! - **Shutdown**: the worker drains its queue and exits when the sender side is dropped.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a handler uses `Arc<Mutex<T>>` and panics while holding the lock.

use std::sync::{Arc, Weak};

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::subscribe::{SubscribeAsync, SubscriptionId};
use super::table::Holder;
use crate::error::{HandlerError, panic_message};
use crate::events::Event;
use crate::events::bus::Inner;

/// Message carried by a subscription queue.
pub(crate) enum Envelope {
    /// Deliver this event.
    Event(Arc<Event>),
    /// Acknowledge once everything enqueued before it has been handled.
    Flush(oneshot::Sender<()>),
}

/// Spawns the worker for one queued subscription on `runtime`.
pub(crate) fn spawn(
    runtime: &Handle,
    id: SubscriptionId,
    name: Arc<str>,
    handler: Holder<dyn SubscribeAsync>,
    mut rx: mpsc::Receiver<Envelope>,
    bus: Weak<Inner>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        while let Some(msg) = rx.recv().await {
            let ev = match msg {
                Envelope::Flush(done) => {
                    let _ = done.send(());
                    continue;
                }
                Envelope::Event(ev) => ev,
            };

            let Some(h) = handler.upgrade() else {
                break;
            };

            let fut = h.on_event(ev.as_ref());
            let outcome = match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(result) => result,
                Err(panic_err) => Err(HandlerError::Panicked {
                    info: panic_message(&*panic_err),
                }),
            };
            drop(h);

            if let Err(err) = outcome {
                if let Some(inner) = bus.upgrade() {
                    inner.report_failure(id, &name, &ev, err);
                }
            }
        }
    })
}
