//! Component registry: dependency injection with ordered construction and teardown.
//!
//! ## Contents
//! - [`Component`], [`ComponentSpec`], [`Dependencies`] registration contract
//! - [`ComponentRegistry`] the container
//! - [`ComponentState`], [`LifecycleEvent`], [`LifecycleListener`] lifecycle observation
//! - [`ComponentLoaded`], [`ComponentUnloaded`] payloads of the `component.*` events

mod component;
mod core;
mod graph;
mod lifecycle;

pub use component::{Component, ComponentLoaded, ComponentSpec, ComponentUnloaded, Dependencies};
pub use self::core::{ComponentInfo, ComponentRegistry, Phase, REGISTRY_SOURCE};
pub use lifecycle::{ComponentState, LifecycleEvent, LifecycleListener, ListenerId, TeardownReport};
