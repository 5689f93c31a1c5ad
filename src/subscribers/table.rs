//! # Subscriber table.
//!
//! Subscriptions indexed by the kind they were registered for. Matching an
//! event walks its kind's ancestry and collects every entry registered for a
//! kind on that chain.
//!
//! ## Rules
//! - The table is only ever touched under the bus lock; `matching` returns
//!   cloned entries so delivery happens after the lock is released.
//! - Matched entries are returned in subscription order (ascending id).
//! - Weak entries whose handler is gone report `is_alive() == false` and are
//!   pruned by the bus.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::mpsc;

use super::subscribe::{Ownership, Subscribe, SubscribeAsync, SubscriptionId};
use super::worker::Envelope;
use crate::events::EventKind;

/// Strong or weak reference to a handler.
pub(crate) enum Holder<T: ?Sized> {
    Strong(Arc<T>),
    Weak(Weak<T>),
}

impl<T: ?Sized> Holder<T> {
    pub(crate) fn new(target: Arc<T>, ownership: Ownership) -> Self {
        match ownership {
            Ownership::Strong => Holder::Strong(target),
            Ownership::Weak => Holder::Weak(Arc::downgrade(&target)),
        }
    }

    pub(crate) fn upgrade(&self) -> Option<Arc<T>> {
        match self {
            Holder::Strong(h) => Some(Arc::clone(h)),
            Holder::Weak(w) => w.upgrade(),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        match self {
            Holder::Strong(_) => true,
            Holder::Weak(w) => w.strong_count() > 0,
        }
    }
}

impl<T: ?Sized> Clone for Holder<T> {
    fn clone(&self) -> Self {
        match self {
            Holder::Strong(h) => Holder::Strong(Arc::clone(h)),
            Holder::Weak(w) => Holder::Weak(Weak::clone(w)),
        }
    }
}

/// Delivery path of a subscription.
#[derive(Clone)]
pub(crate) enum Route {
    /// Called on the emitting thread.
    Inline(Holder<dyn Subscribe>),
    /// Enqueued to the subscription's worker.
    Queued {
        handler: Holder<dyn SubscribeAsync>,
        tx: mpsc::Sender<Envelope>,
    },
}

/// One subscription.
#[derive(Clone)]
pub(crate) struct Entry {
    pub(crate) id: SubscriptionId,
    pub(crate) kind: EventKind,
    pub(crate) name: Arc<str>,
    pub(crate) owner: Option<Arc<str>>,
    pub(crate) route: Route,
}

impl Entry {
    pub(crate) fn is_alive(&self) -> bool {
        match &self.route {
            Route::Inline(h) => h.is_alive(),
            Route::Queued { handler, tx } => handler.is_alive() && !tx.is_closed(),
        }
    }
}

#[derive(Default)]
pub(crate) struct SubscriberTable {
    by_kind: HashMap<&'static str, Vec<Entry>>,
    index: HashMap<SubscriptionId, &'static str>,
}

impl SubscriberTable {
    pub(crate) fn insert(&mut self, entry: Entry) {
        let key = entry.kind.name();
        debug_assert!(
            self.by_kind.get(key).and_then(|e| e.first()).is_none_or(|existing| {
                existing.kind.parent().map(|p| p.name()) == entry.kind.parent().map(|p| p.name())
            }),
            "event kind `{key}` redeclared with a different parent"
        );
        self.index.insert(entry.id, key);
        self.by_kind.entry(key).or_default().push(entry);
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> Option<Entry> {
        let key = self.index.remove(&id)?;
        let entries = self.by_kind.get_mut(key)?;
        let pos = entries.iter().position(|e| e.id == id)?;
        let entry = entries.remove(pos);
        if entries.is_empty() {
            self.by_kind.remove(key);
        }
        Some(entry)
    }

    pub(crate) fn remove_owner(&mut self, owner: &str) -> Vec<Entry> {
        let ids: Vec<SubscriptionId> = self
            .entries()
            .filter(|e| e.owner.as_deref() == Some(owner))
            .map(|e| e.id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Entries for `kind` and every ancestor of it, in subscription order.
    pub(crate) fn matching(&self, kind: &EventKind) -> Vec<Entry> {
        let mut out: Vec<Entry> = kind
            .ancestry()
            .filter_map(|k| self.by_kind.get(k.name()))
            .flatten()
            .cloned()
            .collect();
        out.sort_by_key(|e| e.id);
        out
    }

    /// Ids of entries whose handler is gone.
    pub(crate) fn dead(&self) -> Vec<SubscriptionId> {
        self.entries()
            .filter(|e| !e.is_alive())
            .map(|e| e.id)
            .collect()
    }

    /// Live entries registered for exactly `kind`.
    pub(crate) fn count(&self, kind: &EventKind) -> usize {
        self.by_kind
            .get(kind.name())
            .map(|v| v.iter().filter(|e| e.is_alive()).count())
            .unwrap_or(0)
    }

    pub(crate) fn kinds(&self) -> Vec<EventKind> {
        let mut kinds: Vec<EventKind> = self
            .by_kind
            .values()
            .filter_map(|v| v.first().map(|e| e.kind))
            .collect();
        kinds.sort_unstable_by_key(|k| k.name());
        kinds
    }

    pub(crate) fn queued_senders(&self) -> Vec<mpsc::Sender<Envelope>> {
        self.entries()
            .filter_map(|e| match &e.route {
                Route::Queued { tx, .. } => Some(tx.clone()),
                Route::Inline(_) => None,
            })
            .collect()
    }

    pub(crate) fn drain(&mut self) -> Vec<Entry> {
        self.index.clear();
        self.by_kind.drain().flat_map(|(_, v)| v).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.by_kind.values().flatten()
    }
}
