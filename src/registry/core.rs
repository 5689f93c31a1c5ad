//! # Component registry: dependency-ordered construction and teardown.
//!
//! The registry stores component descriptors, computes an initialization
//! order over their declared dependencies and builds them strictly in that
//! order. Teardown runs in the reverse order.
//!
//! ## Architecture
//! ```text
//! register(spec) ──► descriptors (registration order)
//!                          │
//! resolve() ──► topo sort (pending only) ──► cycle? ──► CircularDependency
//!                          │
//!                          ▼
//!               for each in order: deps ready? ──► factory(&Dependencies)
//!                          │                              │
//!                          │                     instances + init order
//!                          ▼                              │
//!              listeners + component.loaded ◄─────────────┘   (lock released)
//!
//! shutdown() ──► reverse init order ──► Component::teardown() (best effort)
//! ```
//!
//! ## Rules
//! - Table mutations take the write lock; `get` takes the read lock.
//! - `resolve`, `unregister` and `shutdown` are serialized with each other
//!   across threads; the same thread may re-enter them from a callback.
//! - Factories, teardown hooks, listeners and bus emission run with the
//!   table lock released.
//! - A component registered while a resolve is running is built by that
//!   resolve before it returns.
//! - A failed component aborts `resolve`; components built before it stay live.
//! - Registering while resolved builds the new component immediately.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant, SystemTime};

use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, RwLock};
use tracing::{debug, warn};

use super::component::{
    Component, ComponentLoaded, ComponentSpec, ComponentUnloaded, Dependencies, Instance, Source,
};
use super::graph::{self, Graph};
use super::lifecycle::{
    ComponentState, LifecycleEvent, LifecycleListener, ListenerId, Listeners, TeardownReport,
    run_teardown,
};
use crate::config::RegistryConfig;
use crate::error::{ComponentError, RegistryError, panic_message};
use crate::events::{Event, EventBus, kinds};

/// Source identifier used for events published by the registry.
pub const REGISTRY_SOURCE: &str = "component_registry";

/// Registry-wide phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Accumulating descriptors; nothing resolved yet.
    #[default]
    Open,
    /// At least one successful `resolve`; new registrations build immediately.
    Resolved,
    /// Torn down; `register` and `resolve` fail.
    ShutDown,
}

/// Snapshot of one component, for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Component name.
    pub name: String,
    /// Concrete type of the component.
    pub type_name: &'static str,
    /// Declared dependencies.
    pub dependencies: Vec<String>,
    /// Registered components that depend on it directly.
    pub dependents: Vec<String>,
    /// Current state.
    pub state: ComponentState,
    /// When the instance became live.
    pub initialized_at: Option<SystemTime>,
    /// Time spent building the instance.
    pub load_time: Option<Duration>,
}

struct Descriptor {
    deps: Vec<String>,
    source: Option<Source>,
    type_name: &'static str,
    state: ComponentState,
    initialized_at: Option<SystemTime>,
    load_time: Option<Duration>,
}

#[derive(Default)]
struct Table {
    descriptors: IndexMap<String, Descriptor>,
    instances: HashMap<String, Instance>,
    order: Vec<String>,
    phase: Phase,
    /// Thread currently running `resolve`.
    resolver: Option<ThreadId>,
}

impl Table {
    fn graph(&self) -> Graph {
        self.descriptors
            .iter()
            .filter(|(_, d)| d.state != ComponentState::Destroyed)
            .map(|(n, d)| (n.clone(), d.deps.clone()))
            .collect()
    }

    fn pending_graph(&self) -> Graph {
        self.descriptors
            .iter()
            .filter(|(_, d)| d.state == ComponentState::Registered)
            .map(|(n, d)| (n.clone(), d.deps.clone()))
            .collect()
    }

    fn set_state(&mut self, name: &str, state: ComponentState) {
        if let Some(desc) = self.descriptors.get_mut(name) {
            desc.state = state;
        }
    }
}

/// Dependency-injection container for editor components.
///
/// Construct one per application and share it behind an `Arc`.
pub struct ComponentRegistry {
    bus: EventBus,
    cfg: RegistryConfig,
    table: RwLock<Table>,
    /// Serializes `resolve`, `unregister` and `shutdown`.
    resolving: ReentrantMutex<()>,
    listeners: Listeners,
}

impl ComponentRegistry {
    /// Creates an empty registry publishing on `bus`.
    pub fn new(bus: EventBus) -> Self {
        Self::with_config(bus, RegistryConfig::default())
    }

    /// Creates an empty registry with explicit configuration.
    pub fn with_config(bus: EventBus, cfg: RegistryConfig) -> Self {
        Self {
            bus,
            cfg,
            table: RwLock::new(Table::default()),
            resolving: ReentrantMutex::new(()),
            listeners: Listeners::default(),
        }
    }

    /// Adds a component descriptor.
    ///
    /// Nothing is built until [`resolve`](Self::resolve), except when the
    /// registry is already resolved: then the new component is built
    /// immediately and any resolve error is returned. Called from inside a
    /// running resolve (a factory or a listener), the component is queued
    /// and built by that resolve instead.
    ///
    /// # Errors
    /// - [`RegistryError::DuplicateComponent`] if the name is taken; state is unchanged.
    /// - [`RegistryError::ShutDown`] after shutdown.
    pub fn register(&self, spec: ComponentSpec) -> Result<(), RegistryError> {
        let started = Instant::now();
        let ComponentSpec {
            name,
            deps,
            source,
            type_name,
        } = spec;

        let auto_resolve = {
            let mut table = self.table.write();
            if table.phase == Phase::ShutDown {
                return Err(RegistryError::ShutDown);
            }
            if table.descriptors.contains_key(&name) {
                return Err(RegistryError::DuplicateComponent { name });
            }
            table.descriptors.insert(
                name.clone(),
                Descriptor {
                    deps,
                    source: Some(source),
                    type_name,
                    state: ComponentState::Registered,
                    initialized_at: None,
                    load_time: None,
                },
            );
            table.phase == Phase::Resolved && table.resolver != Some(thread::current().id())
        };

        if self.cfg.debug {
            debug!(
                target: "tino_core::registry",
                component = %name, type_name,
                elapsed_us = started.elapsed().as_micros() as u64,
                "registered"
            );
        }
        self.listeners
            .notify(&[LifecycleEvent::new(&name, ComponentState::Registered)]);

        if auto_resolve {
            self.resolve()?;
        }
        Ok(())
    }

    /// Registers a pre-built instance with no dependencies.
    pub fn register_instance<T: Component>(
        &self,
        name: impl Into<String>,
        value: Arc<T>,
    ) -> Result<(), RegistryError> {
        self.register(ComponentSpec::instance(name, value))
    }

    /// Builds every pending component in dependency order.
    ///
    /// Returns the full initialization order (earlier resolves included).
    /// Calling it again with nothing pending is a no-op.
    ///
    /// # Errors
    /// - [`RegistryError::CircularDependency`] before anything is built.
    /// - [`RegistryError::MissingDependency`] before anything is built; the
    ///   component becomes `Failed`.
    /// - [`RegistryError::DependencyFailed`] / [`RegistryError::CreationFailed`]
    ///   for the first component that cannot be built; it becomes `Failed`
    ///   and components built before it stay live.
    /// - [`RegistryError::ShutDown`] after shutdown.
    pub fn resolve(&self) -> Result<Vec<String>, RegistryError> {
        let _serial = self.resolving.lock();
        let started = Instant::now();
        {
            let mut table = self.table.write();
            if table.phase == Phase::ShutDown {
                return Err(RegistryError::ShutDown);
            }
            // Re-entered from a callback: the running resolve finishes the job.
            if table.resolver.is_some() {
                return Ok(table.order.clone());
            }
            table.resolver = Some(thread::current().id());
        }

        let result = self.build_pending();
        self.table.write().resolver = None;
        let (full, built) = result?;

        if self.cfg.debug {
            debug!(
                target: "tino_core::registry",
                built, total = full.len(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "resolved"
            );
        }
        Ok(full)
    }

    /// Builds pending components until none are left, then marks the registry resolved.
    ///
    /// Returns the full initialization order and the number built.
    fn build_pending(&self) -> Result<(Vec<String>, usize), RegistryError> {
        let mut built = 0;
        loop {
            let order = match self.plan_pending() {
                Ok(order) => order,
                Err((err, events)) => {
                    self.listeners.notify(&events);
                    return Err(err);
                }
            };
            for name in &order {
                self.initialize(name)?;
            }
            built += order.len();

            // Registrations made while building are picked up by the next pass.
            let mut table = self.table.write();
            if table.phase == Phase::ShutDown {
                return Err(RegistryError::ShutDown);
            }
            if table.pending_graph().is_empty() {
                table.phase = Phase::Resolved;
                return Ok((table.order.clone(), built));
            }
        }
    }

    /// Orders the pending descriptors, failing on cycles and unknown dependencies.
    fn plan_pending(&self) -> Result<Vec<String>, (RegistryError, Vec<LifecycleEvent>)> {
        let mut table = self.table.write();
        if table.phase == Phase::ShutDown {
            return Err((RegistryError::ShutDown, Vec::new()));
        }

        let pending = table.pending_graph();
        let order = graph::topo_order(&pending).map_err(|cycle| {
            warn!(
                target: "tino_core::registry",
                cycle = %cycle.join(" -> "),
                "circular dependency"
            );
            (RegistryError::CircularDependency { cycle }, Vec::new())
        })?;

        for name in &order {
            let Some(desc) = table.descriptors.get(name) else {
                continue;
            };
            let missing = desc
                .deps
                .iter()
                .find(|dep| !table.descriptors.contains_key(dep.as_str()))
                .cloned();
            if let Some(dependency) = missing {
                table.set_state(name, ComponentState::Failed);
                warn!(
                    target: "tino_core::registry",
                    component = %name, %dependency,
                    "missing dependency"
                );
                let event = LifecycleEvent::new(name, ComponentState::Failed);
                let err = RegistryError::MissingDependency {
                    component: name.clone(),
                    dependency,
                };
                return Err((err, vec![event]));
            }
        }
        Ok(order)
    }

    /// Builds one component whose dependencies are already settled.
    fn initialize(&self, name: &str) -> Result<(), RegistryError> {
        let (source, deps) = {
            let mut table = self.table.write();
            let Some(desc) = table.descriptors.get(name) else {
                return Ok(());
            };
            if desc.state != ComponentState::Registered {
                return Ok(());
            }

            let mut resolved = IndexMap::with_capacity(desc.deps.len());
            let mut unavailable = None;
            for dep in &desc.deps {
                match table.instances.get(dep) {
                    Some(instance) => {
                        resolved.insert(dep.clone(), instance.clone());
                    }
                    None => {
                        unavailable = Some(dep.clone());
                        break;
                    }
                }
            }
            let source = desc.source.clone();

            if let Some(dependency) = unavailable {
                table.set_state(name, ComponentState::Failed);
                drop(table);
                warn!(
                    target: "tino_core::registry",
                    component = name, %dependency,
                    "dependency unavailable"
                );
                self.listeners
                    .notify(&[LifecycleEvent::new(name, ComponentState::Failed)]);
                return Err(RegistryError::DependencyFailed {
                    component: name.to_string(),
                    dependency,
                });
            }

            table.set_state(name, ComponentState::Initializing);
            (source, resolved)
        };
        self.listeners
            .notify(&[LifecycleEvent::new(name, ComponentState::Initializing)]);

        let started = Instant::now();
        let built = match source {
            Some(Source::Instance(instance)) => Ok(instance),
            Some(Source::Factory(factory)) => {
                let deps = Dependencies::new(name.to_string(), deps, self.bus.clone());
                match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| factory(&deps))) {
                    Ok(result) => result,
                    Err(panic_err) => Err(ComponentError::Panicked {
                        info: panic_message(&*panic_err),
                    }),
                }
            }
            None => Err(ComponentError::failed("component has no instance source")),
        };
        let elapsed = started.elapsed();

        let instance = match built {
            Ok(instance) => instance,
            Err(source) => {
                self.table.write().set_state(name, ComponentState::Failed);
                warn!(
                    target: "tino_core::registry",
                    component = name, label = source.as_label(), error = %source,
                    "component creation failed"
                );
                self.listeners
                    .notify(&[LifecycleEvent::new(name, ComponentState::Failed)]);
                return Err(RegistryError::CreationFailed {
                    name: name.to_string(),
                    source,
                });
            }
        };

        let type_name = instance.type_name();
        {
            let mut table = self.table.write();
            let still_wanted = table
                .descriptors
                .get(name)
                .is_some_and(|d| d.state == ComponentState::Initializing);
            if !still_wanted {
                // Unregistered or shut down while the factory ran.
                drop(table);
                let (_, result) = run_teardown(&instance);
                if let Err(err) = result {
                    warn!(
                        target: "tino_core::registry",
                        component = name, label = err.as_label(), error = %err,
                        "teardown of discarded instance failed"
                    );
                }
                return Ok(());
            }
            table.instances.insert(name.to_string(), instance);
            table.order.push(name.to_string());
            if let Some(desc) = table.descriptors.get_mut(name) {
                desc.state = ComponentState::Initialized;
                desc.source = None;
                desc.initialized_at = Some(SystemTime::now());
                desc.load_time = Some(elapsed);
            }
        }

        if self.cfg.debug {
            debug!(
                target: "tino_core::registry",
                component = name, type_name,
                elapsed_us = elapsed.as_micros() as u64,
                "initialized"
            );
        }
        self.listeners
            .notify(&[LifecycleEvent::new(name, ComponentState::Initialized)]);
        if self.cfg.emit_bus_events {
            self.bus.emit(
                Event::new(kinds::COMPONENT_LOADED)
                    .with_source(REGISTRY_SOURCE)
                    .with_payload(ComponentLoaded {
                        name: name.to_string(),
                        type_name,
                        elapsed,
                    }),
            );
        }
        Ok(())
    }

    /// Returns the live instance of `name` as a `T`.
    ///
    /// # Errors
    /// - [`RegistryError::ComponentNotFound`] if unregistered or not initialized.
    /// - [`RegistryError::TypeMismatch`] if the instance is not a `T`.
    pub fn get<T: Component>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        let table = self.table.read();
        let instance = table
            .instances
            .get(name)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                name: name.to_string(),
            })?;
        instance
            .downcast::<T>()
            .ok_or_else(|| RegistryError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Returns the live instance of `name`, untyped.
    pub fn get_any(&self, name: &str) -> Result<Arc<dyn Any + Send + Sync>, RegistryError> {
        self.table
            .read()
            .instances
            .get(name)
            .map(Instance::as_any)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                name: name.to_string(),
            })
    }

    /// Removes `name` and every component depending on it, directly or not.
    ///
    /// Initialized ones are torn down in reverse initialization order.
    ///
    /// # Errors
    /// [`RegistryError::ComponentNotFound`] if `name` is not registered.
    pub fn unregister(&self, name: &str) -> Result<TeardownReport, RegistryError> {
        let _serial = self.resolving.lock();

        let (teardown, dropped) = {
            let mut table = self.table.write();
            let live = table
                .descriptors
                .get(name)
                .is_some_and(|d| d.state != ComponentState::Destroyed);
            if !live {
                return Err(RegistryError::ComponentNotFound {
                    name: name.to_string(),
                });
            }

            let mut victims = graph::transitive_dependents(&table.graph(), name);
            victims.insert(name.to_string());

            let mut teardown = Vec::new();
            for initialized in table.order.iter().rev() {
                if victims.contains(initialized) {
                    if let Some(instance) = table.instances.get(initialized) {
                        teardown.push((initialized.clone(), instance.clone()));
                    }
                }
            }
            let dropped: Vec<String> = table
                .descriptors
                .keys()
                .filter(|n| victims.contains(*n) && !table.instances.contains_key(*n))
                .cloned()
                .collect();

            for victim in &victims {
                table.instances.remove(victim);
                table.descriptors.shift_remove(victim);
            }
            table.order.retain(|n| !victims.contains(n));
            (teardown, dropped)
        };

        let report = self.tear_down(teardown);
        let events: Vec<LifecycleEvent> = dropped
            .iter()
            .map(|n| LifecycleEvent::new(n, ComponentState::Destroyed))
            .collect();
        self.listeners.notify(&events);
        Ok(report)
    }

    /// Tears down every initialized component in reverse initialization order.
    ///
    /// Best effort: failures are recorded and teardown continues. Afterwards
    /// every descriptor is `Destroyed` and `register`/`resolve` fail. Calling
    /// it again returns an empty report.
    pub fn shutdown(&self) -> TeardownReport {
        let _serial = self.resolving.lock();

        let (teardown, idle) = {
            let mut table = self.table.write();
            if table.phase == Phase::ShutDown {
                return TeardownReport::default();
            }
            table.phase = Phase::ShutDown;

            let order = std::mem::take(&mut table.order);
            let teardown: Vec<(String, Instance)> = order
                .into_iter()
                .rev()
                .filter_map(|n| table.instances.remove(&n).map(|i| (n, i)))
                .collect();
            table.instances.clear();

            let mut idle = Vec::new();
            for (name, desc) in table.descriptors.iter_mut() {
                if desc.state != ComponentState::Initialized {
                    idle.push(name.clone());
                }
                desc.state = ComponentState::Destroyed;
                desc.source = None;
            }
            (teardown, idle)
        };

        let report = self.tear_down(teardown);
        let events: Vec<LifecycleEvent> = idle
            .iter()
            .map(|n| LifecycleEvent::new(n, ComponentState::Destroyed))
            .collect();
        self.listeners.notify(&events);

        if self.cfg.debug {
            debug!(
                target: "tino_core::registry",
                torn_down = report.torn_down.len(), failures = report.failures.len(),
                "shut down"
            );
        }
        report
    }

    /// Runs teardown hooks in the given order; the table lock must not be held.
    fn tear_down(&self, components: Vec<(String, Instance)>) -> TeardownReport {
        let mut report = TeardownReport::default();
        for (name, instance) in components {
            let (elapsed, result) = run_teardown(&instance);
            drop(instance);

            let error = result.err();
            if let Some(err) = &error {
                warn!(
                    target: "tino_core::registry",
                    component = %name, label = err.as_label(), error = %err,
                    "teardown failed"
                );
                report.failures.push((name.clone(), err.clone()));
            }
            report.torn_down.push(name.clone());

            self.listeners
                .notify(&[LifecycleEvent::new(&name, ComponentState::Destroyed)]);
            if self.cfg.emit_bus_events {
                self.bus.emit(
                    Event::new(kinds::COMPONENT_UNLOADED)
                        .with_source(REGISTRY_SOURCE)
                        .with_payload(ComponentUnloaded {
                            name,
                            elapsed,
                            error,
                        }),
                );
            }
        }
        report
    }

    /// Adds a lifecycle listener; it sees every later transition.
    pub fn add_listener<L: LifecycleListener>(&self, listener: L) -> ListenerId {
        self.listeners.add(Arc::new(listener))
    }

    /// Adds a lifecycle listener that only sees transitions of `component`.
    pub fn add_listener_for<L: LifecycleListener>(
        &self,
        component: impl Into<String>,
        listener: L,
    ) -> ListenerId {
        let component = component.into();
        self.listeners.add(Arc::new(move |event: &LifecycleEvent| {
            if event.component == component {
                listener.on_transition(event);
            }
        }))
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Initialization order for every registered component, without building anything.
    ///
    /// # Errors
    /// [`RegistryError::CircularDependency`] or the first [`RegistryError::MissingDependency`].
    pub fn plan(&self) -> Result<Vec<String>, RegistryError> {
        let graph = self.table.read().graph();
        if let Some((component, dependency)) = graph::missing(&graph).into_iter().next() {
            return Err(RegistryError::MissingDependency {
                component,
                dependency,
            });
        }
        graph::topo_order(&graph).map_err(|cycle| RegistryError::CircularDependency { cycle })
    }

    /// Every configuration problem: all missing dependencies, then a cycle if any.
    pub fn validate(&self) -> Vec<RegistryError> {
        let graph = self.table.read().graph();
        let mut problems: Vec<RegistryError> = graph::missing(&graph)
            .into_iter()
            .map(|(component, dependency)| RegistryError::MissingDependency {
                component,
                dependency,
            })
            .collect();
        if let Err(cycle) = graph::topo_order(&graph) {
            problems.push(RegistryError::CircularDependency { cycle });
        }
        problems
    }

    /// Declared dependencies of every registered component, in registration order.
    pub fn dependency_graph(&self) -> IndexMap<String, Vec<String>> {
        self.table.read().graph()
    }

    /// Components that declare `name` as a dependency.
    pub fn dependents(&self, name: &str) -> Vec<String> {
        graph::direct_dependents(&self.table.read().graph(), name)
    }

    /// Snapshot of one component.
    pub fn info(&self, name: &str) -> Option<ComponentInfo> {
        let table = self.table.read();
        let desc = table.descriptors.get(name)?;
        Some(ComponentInfo {
            name: name.to_string(),
            type_name: desc.type_name,
            dependencies: desc.deps.clone(),
            dependents: graph::direct_dependents(&table.graph(), name),
            state: desc.state,
            initialized_at: desc.initialized_at,
            load_time: desc.load_time,
        })
    }

    /// Current state of `name`, if registered.
    pub fn state(&self, name: &str) -> Option<ComponentState> {
        self.table.read().descriptors.get(name).map(|d| d.state)
    }

    /// `true` if `name` has a live instance.
    pub fn is_initialized(&self, name: &str) -> bool {
        self.table.read().instances.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn registered(&self) -> Vec<String> {
        self.table.read().descriptors.keys().cloned().collect()
    }

    /// Initialized names, in initialization order.
    pub fn initialized(&self) -> Vec<String> {
        self.table.read().order.clone()
    }

    /// Registry-wide phase.
    pub fn phase(&self) -> Phase {
        self.table.read().phase
    }

    /// The bus handed to factories.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The configuration the registry was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.cfg
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::{HandlerFn, SubscribeOptions};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::mpsc;

    #[derive(Debug)]
    struct Settings;
    impl Component for Settings {}

    #[derive(Debug)]
    struct Files {
        settings: Arc<Settings>,
    }
    impl Component for Files {}

    #[derive(Debug)]
    struct Editor {
        settings: Arc<Settings>,
        files: Arc<Files>,
    }
    impl Component for Editor {}

    /// Appends `"teardown:<name>"` to a shared log; optionally fails.
    struct Tracked {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Component for Tracked {
        fn teardown(&self) -> Result<(), ComponentError> {
            self.log.lock().push(format!("teardown:{}", self.name));
            if self.fail {
                Err(ComponentError::failed("flush failed"))
            } else {
                Ok(())
            }
        }
    }

    fn tracked(name: &'static str, log: &Arc<Mutex<Vec<String>>>, fail: bool) -> Arc<Tracked> {
        Arc::new(Tracked {
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    fn record_transitions(registry: &ComponentRegistry) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.add_listener(move |e: &LifecycleEvent| {
            sink.lock().push(format!("{}:{}", e.component, e.state));
        });
        seen
    }

    fn register_abc(registry: &ComponentRegistry) {
        registry
            .register(ComponentSpec::instance("a", Arc::new(Settings)))
            .unwrap();
        registry
            .register(
                ComponentSpec::factory("b", |deps| {
                    Ok(Arc::new(Files {
                        settings: deps.get::<Settings>("a")?,
                    }))
                })
                .depends_on(["a"]),
            )
            .unwrap();
        registry
            .register(
                ComponentSpec::factory("c", |deps| {
                    Ok(Arc::new(Editor {
                        settings: deps.get::<Settings>("a")?,
                        files: deps.get::<Files>("b")?,
                    }))
                })
                .depends_on(["a", "b"]),
            )
            .unwrap();
    }

    #[test]
    fn test_resolve_orders_and_wires_dependencies() {
        let registry = ComponentRegistry::default();
        register_abc(&registry);

        assert_eq!(registry.resolve().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(registry.phase(), Phase::Resolved);

        let a = registry.get::<Settings>("a").unwrap();
        let b = registry.get::<Files>("b").unwrap();
        let c = registry.get::<Editor>("c").unwrap();
        assert!(Arc::ptr_eq(&c.settings, &a));
        assert!(Arc::ptr_eq(&c.files, &b));
        assert!(Arc::ptr_eq(&b.settings, &a));
    }

    #[test]
    fn test_dependencies_precede_dependents_regardless_of_registration_order() {
        let registry = ComponentRegistry::default();
        registry
            .register(ComponentSpec::instance("editor", Arc::new(Settings)).depends_on(["files"]))
            .unwrap();
        registry
            .register(ComponentSpec::instance("files", Arc::new(Settings)).depends_on(["settings"]))
            .unwrap();
        registry
            .register(ComponentSpec::instance("settings", Arc::new(Settings)))
            .unwrap();

        assert_eq!(registry.resolve().unwrap(), vec!["settings", "files", "editor"]);
    }

    #[test]
    fn test_cycle_names_members_and_builds_nothing() {
        let registry = ComponentRegistry::default();
        let built = Arc::new(AtomicUsize::new(0));
        for (name, dep) in [("x", "y"), ("y", "x")] {
            let built = Arc::clone(&built);
            registry
                .register(
                    ComponentSpec::factory(name, move |_deps| {
                        built.fetch_add(1, AtomicOrdering::SeqCst);
                        Ok(Arc::new(Settings))
                    })
                    .depends_on([dep]),
                )
                .unwrap();
        }

        let err = registry.resolve().unwrap_err();
        let RegistryError::CircularDependency { cycle } = &err else {
            panic!("expected cycle, got {err:?}");
        };
        assert!(cycle.contains(&"x".to_string()) && cycle.contains(&"y".to_string()));
        assert_eq!(err.to_string(), "circular dependency detected: x -> y -> x");
        assert_eq!(built.load(AtomicOrdering::SeqCst), 0);
        assert!(registry.initialized().is_empty());
        assert_eq!(registry.state("x"), Some(ComponentState::Registered));
    }

    #[test]
    fn test_missing_dependency_is_named() {
        let registry = ComponentRegistry::default();
        registry
            .register(ComponentSpec::instance("preview", Arc::new(Settings)).depends_on(["renderer"]))
            .unwrap();

        let err = registry.resolve().unwrap_err();
        assert_eq!(
            err,
            RegistryError::MissingDependency {
                component: "preview".into(),
                dependency: "renderer".into(),
            }
        );
        assert!(err.is_configuration());
        assert_eq!(registry.state("preview"), Some(ComponentState::Failed));
        assert!(!registry.is_initialized("preview"));
    }

    #[test]
    fn test_duplicate_register_leaves_state_unchanged() {
        let registry = ComponentRegistry::default();
        registry
            .register(ComponentSpec::instance("a", Arc::new(Settings)))
            .unwrap();
        let err = registry
            .register(ComponentSpec::instance("a", Arc::new(Settings)).depends_on(["ghost"]))
            .unwrap_err();

        assert_eq!(err, RegistryError::DuplicateComponent { name: "a".into() });
        assert_eq!(registry.registered(), vec!["a"]);
        assert!(registry.dependency_graph()["a"].is_empty());
        assert_eq!(registry.resolve().unwrap(), vec!["a"]);
    }

    #[test]
    fn test_factory_failure_aborts_and_keeps_earlier_instances() {
        let registry = ComponentRegistry::default();
        registry
            .register(ComponentSpec::instance("settings", Arc::new(Settings)))
            .unwrap();
        registry
            .register(
                ComponentSpec::factory("broken", |_deps| -> Result<Arc<Settings>, ComponentError> {
                    Err(ComponentError::failed("no display"))
                })
                .depends_on(["settings"]),
            )
            .unwrap();
        registry
            .register(ComponentSpec::instance("after", Arc::new(Settings)).depends_on(["broken"]))
            .unwrap();

        let err = registry.resolve().unwrap_err();
        assert!(matches!(
            &err,
            RegistryError::CreationFailed { name, source: ComponentError::Failed { .. } } if name == "broken"
        ));
        assert!(registry.is_initialized("settings"));
        assert_eq!(registry.state("broken"), Some(ComponentState::Failed));
        assert_eq!(registry.state("after"), Some(ComponentState::Registered));

        // The dependent can never be built now.
        assert_eq!(
            registry.resolve().unwrap_err(),
            RegistryError::DependencyFailed {
                component: "after".into(),
                dependency: "broken".into(),
            }
        );
    }

    #[test]
    fn test_factory_panic_is_creation_failure() {
        let registry = ComponentRegistry::default();
        registry
            .register(ComponentSpec::factory(
                "explodes",
                |_deps| -> Result<Arc<Settings>, ComponentError> { panic!("factory bug") },
            ))
            .unwrap();

        let err = registry.resolve().unwrap_err();
        assert!(matches!(
            err,
            RegistryError::CreationFailed { source: ComponentError::Panicked { .. }, .. }
        ));
    }

    #[test]
    fn test_undeclared_dependency_access_fails_creation() {
        let registry = ComponentRegistry::default();
        registry
            .register(ComponentSpec::instance("settings", Arc::new(Settings)))
            .unwrap();
        registry
            .register(ComponentSpec::factory("sneaky", |deps| {
                Ok(Arc::new(Files {
                    settings: deps.get::<Settings>("settings")?,
                }))
            }))
            .unwrap();

        let err = registry.resolve().unwrap_err();
        assert!(matches!(
            err,
            RegistryError::CreationFailed {
                source: ComponentError::UndeclaredDependency { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_get_errors() {
        let registry = ComponentRegistry::default();
        registry
            .register(ComponentSpec::instance("settings", Arc::new(Settings)))
            .unwrap();

        assert_eq!(
            registry.get::<Settings>("settings").unwrap_err(),
            RegistryError::ComponentNotFound {
                name: "settings".into()
            }
        );
        registry.resolve().unwrap();
        assert!(matches!(
            registry.get::<Files>("settings"),
            Err(RegistryError::TypeMismatch { .. })
        ));
        assert!(registry.get_any("settings").unwrap().downcast::<Settings>().is_ok());
        assert!(registry.get_any("nope").is_err());
    }

    #[test]
    fn test_repeat_resolve_is_noop() {
        let registry = ComponentRegistry::default();
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        registry
            .register(ComponentSpec::factory("once", move |_deps| {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
                Ok(Arc::new(Settings))
            }))
            .unwrap();

        assert_eq!(registry.resolve().unwrap(), vec!["once"]);
        assert_eq!(registry.resolve().unwrap(), vec!["once"]);
        assert_eq!(built.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_late_registration_builds_immediately() {
        let registry = ComponentRegistry::default();
        registry
            .register(ComponentSpec::instance("settings", Arc::new(Settings)))
            .unwrap();
        registry.resolve().unwrap();

        registry
            .register(
                ComponentSpec::factory("files", |deps| {
                    Ok(Arc::new(Files {
                        settings: deps.get::<Settings>("settings")?,
                    }))
                })
                .depends_on(["settings"]),
            )
            .unwrap();
        assert!(registry.is_initialized("files"));
        assert_eq!(registry.initialized(), vec!["settings", "files"]);

        let err = registry
            .register(ComponentSpec::instance("orphan", Arc::new(Settings)).depends_on(["ghost"]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingDependency { .. }));
    }

    #[test]
    fn test_listeners_see_transitions_in_order() {
        let registry = ComponentRegistry::default();
        let seen = record_transitions(&registry);
        registry
            .register(ComponentSpec::instance("a", Arc::new(Settings)))
            .unwrap();
        registry
            .register(ComponentSpec::instance("b", Arc::new(Settings)).depends_on(["a"]))
            .unwrap();
        registry.resolve().unwrap();
        registry.shutdown();

        assert_eq!(
            *seen.lock(),
            vec![
                "a:registered",
                "b:registered",
                "a:initializing",
                "a:initialized",
                "b:initializing",
                "b:initialized",
                "b:destroyed",
                "a:destroyed",
            ]
        );
    }

    #[test]
    fn test_listener_may_call_back_into_registry() {
        let registry = Arc::new(ComponentRegistry::default());
        let observed = Arc::new(AtomicUsize::new(0));
        let me = Arc::clone(&registry);
        let counter = Arc::clone(&observed);
        registry.add_listener(move |e: &LifecycleEvent| {
            if e.state == ComponentState::Initialized && me.get::<Settings>(&e.component).is_ok() {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
            }
        });

        registry
            .register(ComponentSpec::instance("a", Arc::new(Settings)))
            .unwrap();
        registry.resolve().unwrap();
        assert_eq!(observed.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_remove_listener() {
        let registry = ComponentRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = registry.add_listener(move |_e: &LifecycleEvent| {
            counter.fetch_add(1, AtomicOrdering::SeqCst);
        });
        assert!(registry.remove_listener(id));
        assert!(!registry.remove_listener(id));

        registry
            .register(ComponentSpec::instance("a", Arc::new(Settings)))
            .unwrap();
        assert_eq!(hits.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn test_shutdown_reverse_order_best_effort() {
        let registry = ComponentRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry
            .register(ComponentSpec::instance("settings", tracked("settings", &log, false)))
            .unwrap();
        registry
            .register(
                ComponentSpec::instance("files", tracked("files", &log, true))
                    .depends_on(["settings"]),
            )
            .unwrap();
        registry
            .register(
                ComponentSpec::instance("editor", tracked("editor", &log, false))
                    .depends_on(["files"]),
            )
            .unwrap();
        registry.resolve().unwrap();

        let report = registry.shutdown();
        assert_eq!(
            *log.lock(),
            vec!["teardown:editor", "teardown:files", "teardown:settings"]
        );
        assert_eq!(report.torn_down, vec!["editor", "files", "settings"]);
        assert!(!report.is_clean());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "files");

        assert_eq!(registry.phase(), Phase::ShutDown);
        assert_eq!(registry.state("settings"), Some(ComponentState::Destroyed));
        assert!(registry.get::<Tracked>("settings").is_err());
        assert_eq!(registry.shutdown(), TeardownReport::default());
        assert_eq!(
            registry
                .register(ComponentSpec::instance("late", Arc::new(Settings)))
                .unwrap_err(),
            RegistryError::ShutDown
        );
        assert_eq!(registry.resolve().unwrap_err(), RegistryError::ShutDown);
    }

    #[test]
    fn test_unregister_cascades_to_dependents() {
        let registry = ComponentRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry
            .register(ComponentSpec::instance("settings", tracked("settings", &log, false)))
            .unwrap();
        registry
            .register(
                ComponentSpec::instance("files", tracked("files", &log, false))
                    .depends_on(["settings"]),
            )
            .unwrap();
        registry
            .register(
                ComponentSpec::instance("editor", tracked("editor", &log, false))
                    .depends_on(["files"]),
            )
            .unwrap();
        registry
            .register(ComponentSpec::instance("search", tracked("search", &log, false)))
            .unwrap();
        registry.resolve().unwrap();

        let report = registry.unregister("files").unwrap();
        assert_eq!(report.torn_down, vec!["editor", "files"]);
        assert!(report.is_clean());
        assert_eq!(registry.registered(), vec!["settings", "search"]);
        assert_eq!(registry.initialized(), vec!["settings", "search"]);
        assert_eq!(
            registry.unregister("files").unwrap_err(),
            RegistryError::ComponentNotFound {
                name: "files".into()
            }
        );
    }

    #[test]
    fn test_bus_notifications() {
        let bus = EventBus::default();
        let loaded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&loaded);
        bus.subscribe(
            kinds::COMPONENT,
            HandlerFn::arc("watcher", move |ev: &Event| {
                if let Some(l) = ev.payload::<ComponentLoaded>() {
                    sink.lock().push(format!("loaded:{}", l.name));
                }
                if let Some(u) = ev.payload::<ComponentUnloaded>() {
                    sink.lock().push(format!("unloaded:{}", u.name));
                }
                Ok(())
            }),
            SubscribeOptions::default(),
        );

        let registry = ComponentRegistry::new(bus.clone());
        registry
            .register(ComponentSpec::instance("a", Arc::new(Settings)))
            .unwrap();
        registry.resolve().unwrap();
        registry.shutdown();

        assert_eq!(*loaded.lock(), vec!["loaded:a", "unloaded:a"]);
        assert!(bus.history(None).iter().all(|e| &*e.source == REGISTRY_SOURCE));

        let quiet = ComponentRegistry::with_config(
            bus.clone(),
            RegistryConfig {
                emit_bus_events: false,
                ..RegistryConfig::default()
            },
        );
        quiet
            .register(ComponentSpec::instance("b", Arc::new(Settings)))
            .unwrap();
        quiet.resolve().unwrap();
        assert_eq!(bus.history(None).len(), 2);
    }

    #[test]
    fn test_factory_receives_bus() {
        struct Publisher {
            bus: EventBus,
        }
        impl Component for Publisher {}

        let bus = EventBus::default();
        let registry = ComponentRegistry::with_config(
            bus.clone(),
            RegistryConfig {
                emit_bus_events: false,
                ..RegistryConfig::default()
            },
        );
        registry
            .register(ComponentSpec::factory("publisher", |deps| {
                Ok(Arc::new(Publisher {
                    bus: deps.bus().clone(),
                }))
            }))
            .unwrap();
        registry.resolve().unwrap();

        let publisher = registry.get::<Publisher>("publisher").unwrap();
        publisher.bus.emit(Event::new(kinds::FILE_OPENED));
        assert_eq!(bus.history(None).len(), 1);
    }

    #[test]
    fn test_plan_validate_and_introspection() {
        let registry = ComponentRegistry::default();
        register_abc(&registry);
        assert_eq!(registry.plan().unwrap(), vec!["a", "b", "c"]);
        assert!(registry.validate().is_empty());
        assert!(registry.initialized().is_empty());

        assert_eq!(registry.dependents("a"), vec!["b", "c"]);
        let info = registry.info("c").unwrap();
        assert_eq!(info.dependencies, vec!["a", "b"]);
        assert_eq!(info.state, ComponentState::Registered);
        assert!(info.type_name.ends_with("Editor"));
        assert!(info.load_time.is_none());

        registry.resolve().unwrap();
        let info = registry.info("c").unwrap();
        assert_eq!(info.state, ComponentState::Initialized);
        assert!(info.initialized_at.is_some() && info.load_time.is_some());
        assert!(registry.info("nope").is_none());

        registry
            .register(ComponentSpec::instance("p", Arc::new(Settings)).depends_on(["q", "r"]))
            .unwrap_err();
        let problems = registry.validate();
        assert_eq!(problems.len(), 2);
        assert!(matches!(registry.plan(), Err(RegistryError::MissingDependency { .. })));
    }

    #[test]
    fn test_validate_reports_cycle() {
        let registry = ComponentRegistry::default();
        registry
            .register(ComponentSpec::instance("x", Arc::new(Settings)).depends_on(["y"]))
            .unwrap();
        registry
            .register(ComponentSpec::instance("y", Arc::new(Settings)).depends_on(["x"]))
            .unwrap();

        let problems = registry.validate();
        assert_eq!(problems.len(), 1);
        assert!(matches!(problems[0], RegistryError::CircularDependency { .. }));
        assert!(registry.plan().is_err());
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(ComponentRegistry::default());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry
                        .register(ComponentSpec::instance(format!("c{i}"), Arc::new(Settings)))
                        .unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(registry.registered().len(), 8);
        assert_eq!(registry.resolve().unwrap().len(), 8);

        let resolvers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve().unwrap().len())
            })
            .collect();
        for r in resolvers {
            assert_eq!(r.join().unwrap(), 8);
        }
    }

    #[test]
    fn test_listener_registers_after_resolve() {
        let registry = Arc::new(ComponentRegistry::default());
        registry.register_instance("a", Arc::new(Settings)).unwrap();
        registry.resolve().unwrap();

        let weak = Arc::downgrade(&registry);
        registry.add_listener_for("b", move |e: &LifecycleEvent| {
            if e.state == ComponentState::Initialized {
                if let Some(registry) = weak.upgrade() {
                    registry.register_instance("c", Arc::new(Settings)).unwrap();
                }
            }
        });

        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&registry);
        std::thread::spawn(move || {
            let spec = ComponentSpec::instance("b", Arc::new(Settings)).depends_on(["a"]);
            let _ = tx.send(worker.register(spec));
        });
        rx.recv_timeout(Duration::from_secs(5))
            .expect("register from a listener blocked")
            .unwrap();

        assert_eq!(registry.initialized(), vec!["a", "b", "c"]);
        assert_eq!(registry.phase(), Phase::Resolved);
    }

    #[test]
    fn test_inline_subscriber_registers_after_resolve() {
        let bus = EventBus::default();
        let registry = Arc::new(ComponentRegistry::new(bus.clone()));
        let weak = Arc::downgrade(&registry);
        bus.subscribe(
            kinds::COMPONENT_LOADED,
            HandlerFn::arc("follower", move |ev: &Event| {
                let loaded = ev.payload::<ComponentLoaded>().map(|l| l.name.clone());
                if loaded.as_deref() == Some("a") {
                    if let Some(registry) = weak.upgrade() {
                        registry.register_instance("b", Arc::new(Settings)).unwrap();
                    }
                }
                Ok(())
            }),
            SubscribeOptions::default(),
        );

        registry.resolve().unwrap();
        let (tx, rx) = mpsc::channel();
        let worker = Arc::clone(&registry);
        std::thread::spawn(move || {
            let _ = tx.send(worker.register_instance("a", Arc::new(Settings)));
        });
        rx.recv_timeout(Duration::from_secs(5))
            .expect("register from a subscriber blocked")
            .unwrap();
        assert_eq!(registry.initialized(), vec!["a", "b"]);
    }

    #[test]
    fn test_registration_during_first_resolve_is_built() {
        let registry = Arc::new(ComponentRegistry::default());
        let weak = Arc::downgrade(&registry);
        registry
            .register(ComponentSpec::factory("a", move |_| {
                if let Some(registry) = weak.upgrade() {
                    let late = ComponentSpec::instance("late", Arc::new(Settings)).depends_on(["a"]);
                    registry.register(late).unwrap();
                }
                Ok(Arc::new(Settings))
            }))
            .unwrap();

        assert_eq!(registry.resolve().unwrap(), vec!["a", "late"]);
        assert_eq!(registry.phase(), Phase::Resolved);
        assert_eq!(registry.state("late"), Some(ComponentState::Initialized));
    }

    #[test]
    fn test_factory_registration_while_resolved_waits_for_builder() {
        let registry = Arc::new(ComponentRegistry::default());
        registry.resolve().unwrap();

        let weak = Arc::downgrade(&registry);
        let spec = ComponentSpec::factory("host", move |_| {
            if let Some(registry) = weak.upgrade() {
                let guest = ComponentSpec::instance("guest", Arc::new(Settings)).depends_on(["host"]);
                registry.register(guest).unwrap();
            }
            Ok(Arc::new(Settings))
        });
        registry.register(spec).unwrap();

        assert_eq!(registry.initialized(), vec!["host", "guest"]);
        assert!(registry.get::<Settings>("guest").is_ok());
    }

    #[test]
    fn test_listener_reenters_during_shutdown() {
        let registry = Arc::new(ComponentRegistry::default());
        registry.register_instance("a", Arc::new(Settings)).unwrap();
        registry.resolve().unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let weak = Arc::downgrade(&registry);
        registry.add_listener(move |e: &LifecycleEvent| {
            if let Some(registry) = weak.upgrade() {
                sink.lock().push((e.component.clone(), registry.resolve().err()));
            }
        });

        let report = registry.shutdown();
        assert_eq!(report.torn_down, vec!["a"]);
        assert_eq!(
            *seen.lock(),
            vec![("a".to_string(), Some(RegistryError::ShutDown))]
        );
    }

    #[test]
    fn test_scoped_listener() {
        let registry = ComponentRegistry::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = registry.add_listener_for("b", move |e: &LifecycleEvent| {
            sink.lock().push(format!("{}:{}", e.component, e.state));
        });

        register_abc(&registry);
        registry.resolve().unwrap();
        assert_eq!(
            *seen.lock(),
            vec!["b:registered", "b:initializing", "b:initialized"]
        );

        assert!(registry.remove_listener(id));
        registry.shutdown();
        assert_eq!(seen.lock().len(), 3);
    }
}
