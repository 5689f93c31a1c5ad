//! # tino-core
//!
//! **tino-core** is the architectural backbone of the tino markdown editor:
//! an in-process event bus and a dependency-injection component registry.
//!
//! Components never call each other directly. They are built by the
//! [`ComponentRegistry`] in dependency order, receive the [`EventBus`] in
//! their factory, and from then on only publish and consume [`Event`]s.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ComponentSpec │   │ComponentSpec │   │ComponentSpec │
//!     │  (settings)  │   │   (files)    │   │   (editor)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ComponentRegistry                                                │
//! │  - descriptors in registration order                              │
//! │  - topological init order (cycle / missing detection)             │
//! │  - factories get Dependencies + EventBus                          │
//! │  - lifecycle listeners, reverse-order teardown                    │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │ component.loaded
//!     │   Settings   │   │ FileManager  │   │    Editor    │   │ component.unloaded
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ emit             │ emit             │ emit            │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     EventBus (kind-routed)                        │
//! │   history ring (BusConfig::history_capacity) · failure log        │
//! └───────────┬─────────────────────────────────────┬─────────────────┘
//!             ▼                                     ▼
//!     inline subscriptions                  queued subscriptions
//!   (run before emit returns)          (per-subscription queue + worker)
//!     ┌───────┼───────┐                     ┌───────┼───────┐
//!     ▼       ▼       ▼                     ▼       ▼       ▼
//!   sub1    sub2    subN                 worker1 worker2 workerN
//! ```
//!
//! ### Event kinds
//! ```text
//! event
//!  ├─ file ─────── file.opened · file.saved · file.closed
//!  ├─ editor ───── editor.text_changed · editor.selection_changed · editor.cursor_moved
//!  ├─ search ───── search.performed · search.replaced
//!  ├─ command ──── command.executed · command.failed
//!  ├─ component ── component.loaded · component.unloaded
//!  └─ bus ──────── bus.handler_failed · bus.subscriber_overflow
//! ```
//! A subscription for a kind also receives every refinement of it.
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Events**        | Static kind taxonomy, immutable events with typed payloads.    | [`EventKind`], [`kinds`], [`Event`]         |
//! | **Bus**           | Inline and queued delivery, history, failure capture.          | [`EventBus`], [`Subscribe`], [`SubscribeAsync`] |
//! | **Registry**      | Dependency-ordered construction, lookup and teardown.          | [`ComponentRegistry`], [`ComponentSpec`]    |
//! | **Lifecycle**     | Observe component state transitions.                           | [`LifecycleListener`], [`ComponentState`]   |
//! | **Errors**        | Typed errors for wiring, construction and handlers.            | [`RegistryError`], [`ComponentError`], [`HandlerError`] |
//! | **Configuration** | Capacities and debug toggles.                                  | [`BusConfig`], [`RegistryConfig`]           |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber logging every event through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tino_core::{
//!     Component, ComponentRegistry, ComponentSpec, Event, EventBus, HandlerFn,
//!     SubscribeOptions, kinds,
//! };
//!
//! struct Settings;
//! impl Component for Settings {}
//!
//! struct FileManager { bus: EventBus }
//! impl Component for FileManager {}
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = EventBus::default();
//!     let registry = ComponentRegistry::new(bus.clone());
//!
//!     registry.register_instance("settings", Arc::new(Settings))?;
//!     registry.register(
//!         ComponentSpec::factory("files", |deps| {
//!             let _settings = deps.get::<Settings>("settings")?;
//!             Ok(Arc::new(FileManager { bus: deps.bus().clone() }))
//!         })
//!         .depends_on(["settings"]),
//!     )?;
//!
//!     bus.subscribe(
//!         kinds::FILE,
//!         HandlerFn::arc("title_bar", |ev: &Event| {
//!             let _ = ev.kind;
//!             Ok(())
//!         }),
//!         SubscribeOptions::default(),
//!     );
//!
//!     assert_eq!(registry.resolve()?, vec!["settings", "files"]);
//!
//!     let files = registry.get::<FileManager>("files")?;
//!     assert_eq!(files.bus.emit(Event::new(kinds::FILE_SAVED).with_source("files")), 1);
//!
//!     let report = registry.shutdown();
//!     assert!(report.is_clean());
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod registry;
mod subscribers;

// ---- Public re-exports ----

pub use config::{BusConfig, RegistryConfig};
pub use error::{BusError, ComponentError, HandlerError, RegistryError};
pub use events::{
    Ancestry, BUS_SOURCE, Event, EventBus, EventKind, HandlerFailure, SubscriberOverflow,
    UNKNOWN_SOURCE, kinds,
};
pub use registry::{
    Component, ComponentInfo, ComponentLoaded, ComponentRegistry, ComponentSpec, ComponentState,
    ComponentUnloaded, Dependencies, LifecycleEvent, LifecycleListener, ListenerId, Phase,
    REGISTRY_SOURCE, TeardownReport,
};
pub use subscribers::{
    AsyncHandlerFn, HandlerFn, Ownership, Subscribe, SubscribeAsync, SubscribeOptions,
    SubscriptionId,
};

// Optional: expose the built-in logging subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
