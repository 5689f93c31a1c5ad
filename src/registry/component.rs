//! # Component contract, registration specs and factory inputs.
//!
//! A component is any `Send + Sync` value implementing [`Component`]. It is
//! registered through a [`ComponentSpec`], either as a pre-built instance or
//! as a factory that receives its declared dependencies through
//! [`Dependencies`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tino_core::{Component, ComponentError, ComponentSpec, EventBus};
//!
//! struct Settings { tab_width: usize }
//! impl Component for Settings {}
//!
//! struct Editor { settings: Arc<Settings>, bus: EventBus }
//! impl Component for Editor {}
//!
//! let settings = ComponentSpec::instance("settings", Arc::new(Settings { tab_width: 4 }));
//! let editor = ComponentSpec::factory("editor", |deps| {
//!     Ok(Arc::new(Editor {
//!         settings: deps.get::<Settings>("settings")?,
//!         bus: deps.bus().clone(),
//!     }))
//! })
//! .depends_on(["settings"]);
//!
//! assert_eq!(editor.dependencies(), ["settings".to_string()]);
//! # let _ = settings;
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;

use crate::error::ComponentError;
use crate::events::EventBus;

/// Contract for anything managed by the
/// [`ComponentRegistry`](crate::ComponentRegistry).
pub trait Component: Send + Sync + 'static {
    /// Cleanup hook called once during unregister or shutdown.
    ///
    /// Components are torn down in reverse initialization order, so every
    /// dependency is still alive when this runs. Errors and panics are
    /// recorded and do not stop the remaining teardown.
    fn teardown(&self) -> Result<(), ComponentError> {
        Ok(())
    }
}

/// Live component, kept both as `Any` (typed lookup) and as `Component` (teardown).
#[derive(Clone)]
pub(crate) struct Instance {
    any: Arc<dyn Any + Send + Sync>,
    component: Arc<dyn Component>,
    type_name: &'static str,
}

impl Instance {
    pub(crate) fn new<T: Component>(value: Arc<T>) -> Self {
        Self {
            any: value.clone(),
            component: value,
            type_name: type_name::<T>(),
        }
    }

    pub(crate) fn downcast<T: Component>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.any).downcast::<T>().ok()
    }

    pub(crate) fn as_any(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.any)
    }

    pub(crate) fn component(&self) -> &dyn Component {
        self.component.as_ref()
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.type_name
    }
}

pub(crate) type FactoryFn = dyn Fn(&Dependencies) -> Result<Instance, ComponentError> + Send + Sync;

/// Where the instance of a component comes from.
#[derive(Clone)]
pub(crate) enum Source {
    Instance(Instance),
    Factory(Arc<FactoryFn>),
}

/// Registration request: name, dependencies and instance source.
pub struct ComponentSpec {
    pub(crate) name: String,
    pub(crate) deps: Vec<String>,
    pub(crate) source: Source,
    pub(crate) type_name: &'static str,
}

impl ComponentSpec {
    /// Component built by `f` once its dependencies are initialized.
    pub fn factory<T, F>(name: impl Into<String>, f: F) -> Self
    where
        T: Component,
        F: Fn(&Dependencies) -> Result<Arc<T>, ComponentError> + Send + Sync + 'static,
    {
        let build: Arc<FactoryFn> = Arc::new(move |deps: &Dependencies| f(deps).map(Instance::new));
        Self {
            name: name.into(),
            deps: Vec::new(),
            source: Source::Factory(build),
            type_name: type_name::<T>(),
        }
    }

    /// Pre-built component, used as is.
    pub fn instance<T: Component>(name: impl Into<String>, value: Arc<T>) -> Self {
        Self {
            name: name.into(),
            deps: Vec::new(),
            source: Source::Instance(Instance::new(value)),
            type_name: type_name::<T>(),
        }
    }

    /// Declares dependencies by name. Duplicates are collapsed, first occurrence wins.
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dep in deps {
            let dep = dep.into();
            if !self.deps.contains(&dep) {
                self.deps.push(dep);
            }
        }
        self
    }

    /// Component name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared dependencies, in declaration order.
    pub fn dependencies(&self) -> &[String] {
        &self.deps
    }

    /// Concrete type of the component.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ComponentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            Source::Instance(_) => "instance",
            Source::Factory(_) => "factory",
        };
        f.debug_struct("ComponentSpec")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("source", &source)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Initialized dependencies handed to a factory.
///
/// Only the dependencies the component declared are reachable.
pub struct Dependencies {
    component: String,
    resolved: IndexMap<String, Instance>,
    bus: EventBus,
}

impl Dependencies {
    pub(crate) fn new(component: String, resolved: IndexMap<String, Instance>, bus: EventBus) -> Self {
        Self {
            component,
            resolved,
            bus,
        }
    }

    /// Returns the declared dependency `name` as a `T`.
    ///
    /// # Errors
    /// - [`ComponentError::UndeclaredDependency`] if `name` was not declared.
    /// - [`ComponentError::TypeMismatch`] if it is not a `T`.
    pub fn get<T: Component>(&self, name: &str) -> Result<Arc<T>, ComponentError> {
        let instance = self
            .resolved
            .get(name)
            .ok_or_else(|| ComponentError::UndeclaredDependency {
                name: name.to_string(),
            })?;
        instance
            .downcast::<T>()
            .ok_or_else(|| ComponentError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// The application bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Name of the component being built.
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Declared dependency names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.resolved.keys().map(String::as_str)
    }
}

/// Payload of `component.loaded`.
#[derive(Debug, Clone)]
pub struct ComponentLoaded {
    /// Component name.
    pub name: String,
    /// Concrete type of the component.
    pub type_name: &'static str,
    /// Time spent building the instance.
    pub elapsed: Duration,
}

/// Payload of `component.unloaded`.
#[derive(Debug, Clone)]
pub struct ComponentUnloaded {
    /// Component name.
    pub name: String,
    /// Time spent in the teardown hook.
    pub elapsed: Duration,
    /// Teardown failure, if any.
    pub error: Option<ComponentError>,
}
