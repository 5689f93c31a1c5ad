//! # Bus and registry configuration.
//!
//! Provides [`BusConfig`] and [`RegistryConfig`], the only knobs of the core.
//!
//! Config is used in two ways:
//! 1. **Bus creation**: `EventBus::new(config)`
//! 2. **Registry creation**: `ComponentRegistry::with_config(bus, config)`
//!
//! ## Sentinel values
//! - `history_capacity = 0` → clamped to 1 (history is always bounded and non-empty)
//! - `queue_capacity = 0` → clamped to 1
//! - `failure_capacity = 0` → failures are logged but not retained

/// Configuration for the [`EventBus`](crate::EventBus).
///
/// ## Field semantics
/// - `history_capacity`: Number of most recent events kept for inspection (min 1)
/// - `queue_capacity`: Per-subscription queue size for queued delivery (min 1)
/// - `failure_capacity`: Number of handler failures retained (`0` = none)
/// - `debug`: Initial state of the debug toggle
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Maximum number of events kept in the history ring buffer.
    ///
    /// When full, the oldest event is evicted first.
    pub history_capacity: usize,

    /// Capacity of each queued subscription's delivery queue.
    ///
    /// On overflow the event is dropped for that subscription only and a
    /// `bus.subscriber_overflow` event is published.
    pub queue_capacity: usize,

    /// Maximum number of handler failures retained for inspection.
    pub failure_capacity: usize,

    /// Emit timing trace records for subscribe/unsubscribe/emit.
    pub debug: bool,
}

impl BusConfig {
    /// Returns the history capacity clamped to a minimum of 1.
    #[inline]
    pub fn history_capacity_clamped(&self) -> usize {
        self.history_capacity.max(1)
    }

    /// Returns the queue capacity clamped to a minimum of 1.
    ///
    /// `tokio::sync::mpsc::channel` panics on zero capacity.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `history_capacity = 100`
    /// - `queue_capacity = 1024`
    /// - `failure_capacity = 100`
    /// - `debug = false`
    fn default() -> Self {
        Self {
            history_capacity: 100,
            queue_capacity: 1024,
            failure_capacity: 100,
            debug: false,
        }
    }
}

/// Configuration for the [`ComponentRegistry`](crate::ComponentRegistry).
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// Publish `component.loaded` / `component.unloaded` on the bus.
    pub emit_bus_events: bool,

    /// Emit timing trace records for register/resolve/teardown.
    pub debug: bool,
}

impl Default for RegistryConfig {
    /// Default configuration:
    ///
    /// - `emit_bus_events = true`
    /// - `debug = false`
    fn default() -> Self {
        Self {
            emit_bus_events: true,
            debug: false,
        }
    }
}
