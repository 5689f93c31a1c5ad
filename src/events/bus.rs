//! # Event bus: decoupled publish/subscribe between components.
//!
//! [`EventBus`] delivers each emitted [`Event`] to every subscription whose
//! kind matches (exact kind or an ancestor of it), keeps a bounded history
//! and captures handler failures.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                    Subscriptions:
//!   FileManager ──┐                       ┌──► inline handler (on emitter thread)
//!   Editor      ──┼──► emit(Event) ──► snapshot ──► inline handler
//!   Registry    ──┘        │                └──► [queue] ──► worker ──► async handler
//!                          └──► history ring (bounded)
//! ```
//!
//! ## Rules
//! - **Snapshot delivery**: the subscriber table lock is held only while the
//!   matching entries are cloned; no lock is held while handlers run, so
//!   handlers may subscribe, unsubscribe or emit.
//! - **Isolation**: a failing or panicking handler never affects the publisher
//!   or the remaining subscriptions; the failure is logged, kept in the failure
//!   log and republished as `bus.handler_failed`.
//! - **No feedback loops**: failures and overflows while handling `bus.*`
//!   events are recorded but not republished.
//! - **Weak pruning**: dead weak subscriptions are skipped and removed lazily
//!   during `emit`.
//! - **Queued delivery**: per-subscription FIFO only; no ordering across
//!   subscriptions.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tino_core::{Event, EventBus, HandlerError, HandlerFn, SubscribeOptions, kinds};
//!
//! let bus = EventBus::default();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//!
//! bus.subscribe(
//!     kinds::FILE,
//!     HandlerFn::arc("counter", move |_ev: &Event| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!         Ok::<_, HandlerError>(())
//!     }),
//!     SubscribeOptions::default(),
//! );
//!
//! bus.emit(Event::new(kinds::FILE_SAVED).with_source("file_manager"));
//! bus.emit(Event::new(kinds::CURSOR_MOVED));
//!
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! assert_eq!(bus.history(None).len(), 2);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::time::{Instant, SystemTime};

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::diagnostics::{BUS_SOURCE, HandlerFailure, SubscriberOverflow};
use super::event::Event;
use super::history::Ring;
use super::kind::{EventKind, kinds};
use crate::config::BusConfig;
use crate::error::{BusError, HandlerError, panic_message};
use crate::subscribers::table::{Entry, Holder, Route, SubscriberTable};
use crate::subscribers::worker::{self, Envelope};
use crate::subscribers::{Subscribe, SubscribeAsync, SubscribeOptions, SubscriptionId};

/// Shared, cheaply cloneable event bus.
///
/// Construct one per application and pass clones to every component.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    cfg: BusConfig,
    table: RwLock<SubscriberTable>,
    history: Mutex<Ring<Arc<Event>>>,
    failures: Mutex<Ring<HandlerFailure>>,
    workers: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
    runtime: Option<Handle>,
    debug: AtomicBool,
    next_id: AtomicU64,
    emitted: AtomicU64,
}

impl EventBus {
    /// Creates a bus; queued subscriptions will run on the ambient Tokio runtime, if any.
    pub fn new(cfg: BusConfig) -> Self {
        Self::build(cfg, Handle::try_current().ok())
    }

    /// Creates a bus whose queued subscriptions run on `runtime`.
    pub fn with_runtime(cfg: BusConfig, runtime: Handle) -> Self {
        Self::build(cfg, Some(runtime))
    }

    fn build(cfg: BusConfig, runtime: Option<Handle>) -> Self {
        let history = Ring::new(cfg.history_capacity_clamped());
        let failures = Ring::new(cfg.failure_capacity);
        Self {
            inner: Arc::new(Inner {
                debug: AtomicBool::new(cfg.debug),
                cfg,
                table: RwLock::new(SubscriberTable::default()),
                history: Mutex::new(history),
                failures: Mutex::new(failures),
                workers: Mutex::new(HashMap::new()),
                runtime,
                next_id: AtomicU64::new(1),
                emitted: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribes an inline handler to `kind` and all of its refinements.
    ///
    /// The handler runs on the emitting thread before `emit` returns.
    /// Subscribing the same handler twice creates two independent deliveries.
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: Arc<dyn Subscribe>,
        opts: SubscribeOptions,
    ) -> SubscriptionId {
        let started = Instant::now();
        let id = self.inner.next_id();
        let name: Arc<str> = Arc::from(handler.name());
        let entry = Entry {
            id,
            kind,
            name,
            owner: opts.owner,
            route: Route::Inline(Holder::new(handler, opts.ownership)),
        };
        self.inner.table.write().insert(entry);

        if self.is_debug() {
            debug!(
                target: "tino_core::bus",
                %id, %kind, ownership = ?opts.ownership, delivery = "inline",
                elapsed_us = started.elapsed().as_micros() as u64,
                "subscribed"
            );
        }
        id
    }

    /// Subscribes a queued handler to `kind` and all of its refinements.
    ///
    /// Events are enqueued by `emit` and handled on a dedicated worker task.
    ///
    /// # Errors
    /// [`BusError::NoRuntime`] if the bus has no Tokio runtime to spawn the worker on.
    pub fn subscribe_async(
        &self,
        kind: EventKind,
        handler: Arc<dyn SubscribeAsync>,
        opts: SubscribeOptions,
    ) -> Result<SubscriptionId, BusError> {
        let started = Instant::now();
        let runtime = self
            .inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok())
            .ok_or(BusError::NoRuntime)?;

        let id = self.inner.next_id();
        let name: Arc<str> = Arc::from(handler.name());
        let holder = Holder::new(handler, opts.ownership);
        let (tx, rx) = mpsc::channel(self.inner.cfg.queue_capacity_clamped());

        let join = worker::spawn(
            &runtime,
            id,
            Arc::clone(&name),
            holder.clone(),
            rx,
            Arc::downgrade(&self.inner),
        );
        self.inner.workers.lock().insert(id, join);
        self.inner.table.write().insert(Entry {
            id,
            kind,
            name,
            owner: opts.owner,
            route: Route::Queued {
                handler: holder,
                tx,
            },
        });

        if self.is_debug() {
            debug!(
                target: "tino_core::bus",
                %id, %kind, ownership = ?opts.ownership, delivery = "queued",
                elapsed_us = started.elapsed().as_micros() as u64,
                "subscribed"
            );
        }
        Ok(id)
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    ///
    /// A queued subscription's worker finishes the events already enqueued
    /// and then exits.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let started = Instant::now();
        let removed = self.inner.table.write().remove(id);
        let found = removed.is_some();
        if found {
            self.inner.workers.lock().remove(&id);
        }

        if self.is_debug() {
            debug!(
                target: "tino_core::bus",
                %id, found,
                elapsed_us = started.elapsed().as_micros() as u64,
                "unsubscribed"
            );
        }
        found
    }

    /// Removes every subscription tagged with `owner`. Returns how many were removed.
    pub fn unsubscribe_owner(&self, owner: &str) -> usize {
        let removed = self.inner.table.write().remove_owner(owner);
        let mut workers = self.inner.workers.lock();
        for entry in &removed {
            workers.remove(&entry.id);
        }
        drop(workers);

        if self.is_debug() {
            debug!(target: "tino_core::bus", owner, removed = removed.len(), "unsubscribed owner");
        }
        removed.len()
    }

    /// Delivers `event` to every matching subscription.
    ///
    /// Returns the number of subscriptions the event was offered to (inline
    /// handlers called plus queued handlers enqueued). The event is added to
    /// the history even if nothing matched.
    pub fn emit(&self, event: Event) -> usize {
        self.inner.emit(event)
    }

    /// Most recent events, oldest first, capped at `limit` newest entries.
    pub fn history(&self, limit: Option<usize>) -> Vec<Arc<Event>> {
        self.inner.history.lock().recent(limit)
    }

    /// Forgets the recorded history.
    pub fn clear_history(&self) {
        self.inner.history.lock().clear();
    }

    /// Captured handler failures, oldest first.
    pub fn failures(&self) -> Vec<HandlerFailure> {
        self.inner.failures.lock().recent(None)
    }

    /// Forgets the captured handler failures.
    pub fn clear_failures(&self) {
        self.inner.failures.lock().clear();
    }

    /// Toggles timing trace records for subscribe/unsubscribe/emit.
    pub fn set_debug(&self, enabled: bool) {
        self.inner.debug.store(enabled, AtomicOrdering::Relaxed);
    }

    /// Returns the debug toggle.
    pub fn is_debug(&self) -> bool {
        self.inner.debug.load(AtomicOrdering::Relaxed)
    }

    /// Number of live subscriptions registered for exactly `kind`.
    pub fn subscriber_count(&self, kind: &EventKind) -> usize {
        self.inner.table.read().count(kind)
    }

    /// Total number of subscriptions, including dead weak ones not yet pruned.
    pub fn subscription_count(&self) -> usize {
        self.inner.table.read().len()
    }

    /// Kinds with at least one subscription, sorted by name.
    pub fn subscribed_kinds(&self) -> Vec<EventKind> {
        self.inner.table.read().kinds()
    }

    /// Total number of `emit` calls so far.
    pub fn events_emitted(&self) -> u64 {
        self.inner.emitted.load(AtomicOrdering::Relaxed)
    }

    /// Removes dead weak subscriptions now. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let dead = self.inner.table.read().dead();
        self.inner.remove_many(&dead)
    }

    /// The configuration the bus was built with.
    pub fn config(&self) -> &BusConfig {
        &self.inner.cfg
    }

    /// Waits until every queued subscription has handled all events enqueued before this call.
    pub async fn flush(&self) {
        let senders = self.inner.table.read().queued_senders();
        let mut waits = Vec::with_capacity(senders.len());
        for tx in senders {
            let (done, wait) = oneshot::channel();
            if tx.send(Envelope::Flush(done)).await.is_ok() {
                waits.push(wait);
            }
        }
        for wait in waits {
            let _ = wait.await;
        }
    }

    /// Removes every subscription and waits for queued workers to drain and exit.
    pub async fn shutdown(&self) {
        let entries = self.inner.table.write().drain();
        drop(entries);

        let workers: Vec<JoinHandle<()>> = self
            .inner
            .workers
            .lock()
            .drain()
            .map(|(_, join)| join)
            .collect();
        for join in workers {
            let _ = join.await;
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl Inner {
    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed))
    }

    fn debug(&self) -> bool {
        self.debug.load(AtomicOrdering::Relaxed)
    }

    pub(crate) fn emit(&self, event: Event) -> usize {
        let started = Instant::now();
        let event = Arc::new(event);
        self.emitted.fetch_add(1, AtomicOrdering::Relaxed);
        self.history.lock().push(Arc::clone(&event));

        let targets = self.table.read().matching(&event.kind);

        let mut offered = 0;
        let mut dead = Vec::new();
        for entry in &targets {
            match &entry.route {
                Route::Inline(holder) => {
                    let Some(handler) = holder.upgrade() else {
                        dead.push(entry.id);
                        continue;
                    };
                    offered += 1;
                    if let Err(err) = call_inline(handler.as_ref(), &event) {
                        self.report_failure(entry.id, &entry.name, &event, err);
                    }
                }
                Route::Queued { handler, tx } => {
                    if !handler.is_alive() {
                        dead.push(entry.id);
                        continue;
                    }
                    match tx.try_send(Envelope::Event(Arc::clone(&event))) {
                        Ok(()) => offered += 1,
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            self.report_overflow(entry, &event);
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => dead.push(entry.id),
                    }
                }
            }
        }
        if !dead.is_empty() {
            self.remove_many(&dead);
        }

        if self.debug() {
            debug!(
                target: "tino_core::bus",
                kind = %event.kind, seq = event.seq, source = %event.source,
                matched = targets.len(), offered,
                elapsed_us = started.elapsed().as_micros() as u64,
                "emitted"
            );
        }
        offered
    }

    pub(crate) fn report_failure(
        &self,
        id: SubscriptionId,
        name: &Arc<str>,
        event: &Event,
        error: HandlerError,
    ) {
        warn!(
            target: "tino_core::bus",
            subscription = %id, handler = %name, kind = %event.kind, seq = event.seq,
            label = error.as_label(), error = %error,
            "event handler failed"
        );

        let failure = HandlerFailure {
            subscription: id,
            handler: Arc::clone(name),
            kind: event.kind,
            seq: event.seq,
            error,
            at: SystemTime::now(),
        };
        self.failures.lock().push(failure.clone());

        if !event.is(&kinds::BUS) {
            self.emit(
                Event::new(kinds::HANDLER_FAILED)
                    .with_source(BUS_SOURCE)
                    .with_payload(failure),
            );
        }
    }

    fn report_overflow(&self, entry: &Entry, event: &Event) {
        warn!(
            target: "tino_core::bus",
            subscription = %entry.id, handler = %entry.name, kind = %event.kind, seq = event.seq,
            "subscriber queue full; event dropped"
        );

        if !event.is(&kinds::BUS) {
            self.emit(
                Event::new(kinds::SUBSCRIBER_OVERFLOW)
                    .with_source(BUS_SOURCE)
                    .with_payload(SubscriberOverflow {
                        subscription: entry.id,
                        handler: Arc::clone(&entry.name),
                        kind: event.kind,
                        seq: event.seq,
                    }),
            );
        }
    }

    fn remove_many(&self, ids: &[SubscriptionId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let mut table = self.table.write();
        let removed = ids.iter().filter(|id| table.remove(**id).is_some()).count();
        drop(table);

        let mut workers = self.workers.lock();
        for id in ids {
            workers.remove(id);
        }
        drop(workers);

        if self.debug() && removed > 0 {
            debug!(target: "tino_core::bus", removed, "pruned dead subscriptions");
        }
        removed
    }
}

/// Runs an inline handler, converting a panic into [`HandlerError::Panicked`].
fn call_inline(handler: &dyn Subscribe, event: &Event) -> Result<(), HandlerError> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler.on_event(event))) {
        Ok(result) => result,
        Err(panic_err) => Err(HandlerError::Panicked {
            info: panic_message(&*panic_err),
        }),
    }
}
