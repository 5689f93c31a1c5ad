//! # Component lifecycle: states, transition events and listeners.
//!
//! ```text
//! Registered ──► Initializing ──► Initialized ──► Destroyed
//!     │               │
//!     └───────────────┴──► Failed
//! ```
//!
//! Listeners are called synchronously, in registration order, after the
//! registry has released its table lock, so a listener may call back into the
//! registry. A panicking listener is logged and skipped.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::RwLock;
use tracing::warn;

use super::component::Instance;
use crate::error::{ComponentError, panic_message};

/// Per-component lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ComponentState {
    /// Descriptor stored, nothing built yet.
    Registered,
    /// Factory is running.
    Initializing,
    /// Instance is live and reachable through `get`.
    Initialized,
    /// Creation failed or a dependency was unavailable; terminal.
    Failed,
    /// Torn down; terminal.
    Destroyed,
}

impl ComponentState {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ComponentState::Registered => "registered",
            ComponentState::Initializing => "initializing",
            ComponentState::Initialized => "initialized",
            ComponentState::Failed => "failed",
            ComponentState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// One state transition of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Component name.
    pub component: String,
    /// State entered.
    pub state: ComponentState,
    /// When the transition happened.
    pub at: SystemTime,
}

impl LifecycleEvent {
    pub(crate) fn new(component: impl Into<String>, state: ComponentState) -> Self {
        Self {
            component: component.into(),
            state,
            at: SystemTime::now(),
        }
    }
}

/// Observer of component state transitions.
///
/// Implemented for every `Fn(&LifecycleEvent)` closure.
pub trait LifecycleListener: Send + Sync + 'static {
    /// Called once per transition.
    fn on_transition(&self, event: &LifecycleEvent);
}

impl<F> LifecycleListener for F
where
    F: Fn(&LifecycleEvent) + Send + Sync + 'static,
{
    fn on_transition(&self, event: &LifecycleEvent) {
        self(event)
    }
}

/// Handle returned by `add_listener`; pass it to `remove_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Listener list, kept apart from the registry tables.
#[derive(Default)]
pub(crate) struct Listeners {
    entries: RwLock<Vec<(ListenerId, Arc<dyn LifecycleListener>)>>,
    next_id: AtomicU64,
}

impl Listeners {
    pub(crate) fn add(&self, listener: Arc<dyn LifecycleListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed));
        self.entries.write().push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    /// Delivers `events` in order to a snapshot of the listeners.
    pub(crate) fn notify(&self, events: &[LifecycleEvent]) {
        if events.is_empty() {
            return;
        }
        let snapshot: Vec<Arc<dyn LifecycleListener>> =
            self.entries.read().iter().map(|(_, l)| Arc::clone(l)).collect();

        for event in events {
            for listener in &snapshot {
                let call = std::panic::AssertUnwindSafe(|| listener.on_transition(event));
                if let Err(panic_err) = std::panic::catch_unwind(call) {
                    warn!(
                        target: "tino_core::registry",
                        component = %event.component, state = %event.state,
                        info = %panic_message(&*panic_err),
                        "lifecycle listener panicked"
                    );
                }
            }
        }
    }
}

/// Outcome of an unregister or shutdown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Components whose teardown hook ran, in teardown order.
    pub torn_down: Vec<String>,
    /// Components whose hook failed or panicked, in teardown order.
    pub failures: Vec<(String, ComponentError)>,
}

impl TeardownReport {
    /// `true` when every hook succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs one teardown hook with panic isolation.
pub(crate) fn run_teardown(instance: &Instance) -> (Duration, Result<(), ComponentError>) {
    let started = Instant::now();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        instance.component().teardown()
    }));
    let result = match outcome {
        Ok(result) => result,
        Err(panic_err) => Err(ComponentError::Panicked {
            info: panic_message(&*panic_err),
        }),
    };
    (started.elapsed(), result)
}
