//! Error types used by the event bus and the component registry.
//!
//! This module defines four error enums:
//!
//! - [`RegistryError`] wiring/configuration errors raised by the registry.
//! - [`ComponentError`] errors raised by component factories and teardown hooks.
//! - [`HandlerError`] errors raised by event handlers (captured, never propagated).
//! - [`BusError`] errors raised by the bus itself.
//!
//! All of them provide `as_label` for logs/diagnostics.

use thiserror::Error;

/// # Errors produced by the component registry.
///
/// Configuration errors (`DuplicateComponent`, `MissingDependency`,
/// `CircularDependency`) indicate a wiring mistake and are fatal to startup.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A component with the same name is already registered.
    #[error("component `{name}` is already registered")]
    DuplicateComponent {
        /// The conflicting name.
        name: String,
    },

    /// A declared dependency was never registered.
    #[error("component `{component}` depends on unregistered component `{dependency}`")]
    MissingDependency {
        /// The component that declared the dependency.
        component: String,
        /// The missing dependency name.
        dependency: String,
    },

    /// The dependency graph contains a cycle.
    ///
    /// `cycle` lists the members in traversal order and repeats the first
    /// member at the end (`[a, b, a]`).
    #[error("circular dependency detected: {}", .cycle.join(" -> "))]
    CircularDependency {
        /// Components forming the cycle.
        cycle: Vec<String>,
    },

    /// The component is not registered or not initialized yet.
    #[error("component `{name}` is not registered or not initialized")]
    ComponentNotFound {
        /// The requested name.
        name: String,
    },

    /// A dependency exists but failed (or was destroyed) before this component could use it.
    #[error("component `{component}` cannot be built: dependency `{dependency}` is unavailable")]
    DependencyFailed {
        /// The component being initialized.
        component: String,
        /// The unavailable dependency.
        dependency: String,
    },

    /// The factory of a component returned an error or panicked.
    #[error("failed to create component `{name}`: {source}")]
    CreationFailed {
        /// The component name.
        name: String,
        /// The factory error.
        #[source]
        source: ComponentError,
    },

    /// The live instance is not of the requested type.
    #[error("component `{name}` is not a `{expected}`")]
    TypeMismatch {
        /// The component name.
        name: String,
        /// The requested type name.
        expected: &'static str,
    },

    /// The registry has been shut down.
    #[error("registry is shut down")]
    ShutDown,
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use tino_core::RegistryError;
    ///
    /// let err = RegistryError::CircularDependency { cycle: vec!["x".into(), "y".into(), "x".into()] };
    /// assert_eq!(err.as_label(), "registry_circular_dependency");
    /// assert_eq!(err.to_string(), "circular dependency detected: x -> y -> x");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateComponent { .. } => "registry_duplicate_component",
            RegistryError::MissingDependency { .. } => "registry_missing_dependency",
            RegistryError::CircularDependency { .. } => "registry_circular_dependency",
            RegistryError::ComponentNotFound { .. } => "registry_component_not_found",
            RegistryError::DependencyFailed { .. } => "registry_dependency_failed",
            RegistryError::CreationFailed { .. } => "registry_creation_failed",
            RegistryError::TypeMismatch { .. } => "registry_type_mismatch",
            RegistryError::ShutDown => "registry_shut_down",
        }
    }

    /// Indicates a wiring mistake (fatal at startup, no recovery path).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RegistryError::DuplicateComponent { .. }
                | RegistryError::MissingDependency { .. }
                | RegistryError::CircularDependency { .. }
        )
    }
}

/// # Errors produced by component factories and teardown hooks.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// Component-specific failure.
    #[error("{reason}")]
    Failed {
        /// Human-readable reason.
        reason: String,
    },

    /// A factory asked for a dependency it did not declare.
    #[error("dependency `{name}` was not declared")]
    UndeclaredDependency {
        /// The requested name.
        name: String,
    },

    /// A dependency is not of the requested type.
    #[error("dependency `{name}` is not a `{expected}`")]
    TypeMismatch {
        /// The dependency name.
        name: String,
        /// The requested type name.
        expected: &'static str,
    },

    /// The factory or teardown hook panicked.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl ComponentError {
    /// Shorthand for [`ComponentError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        ComponentError::Failed {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ComponentError::Failed { .. } => "component_failed",
            ComponentError::UndeclaredDependency { .. } => "component_undeclared_dependency",
            ComponentError::TypeMismatch { .. } => "component_type_mismatch",
            ComponentError::Panicked { .. } => "component_panicked",
        }
    }
}

/// # Errors produced by event handlers.
///
/// The bus captures these; they never reach the publisher.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Handler reported a failure.
    #[error("handler failed: {reason}")]
    Failed {
        /// Human-readable reason.
        reason: String,
    },

    /// Handler panicked.
    #[error("handler panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    ///
    /// # Example
    /// ```
    /// use tino_core::HandlerError;
    ///
    /// let err = HandlerError::fail("disk full");
    /// assert_eq!(err.as_label(), "handler_failed");
    /// assert_eq!(err.to_string(), "handler failed: disk full");
    /// ```
    pub fn fail(reason: impl Into<String>) -> Self {
        HandlerError::Failed {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Failed { .. } => "handler_failed",
            HandlerError::Panicked { .. } => "handler_panicked",
        }
    }
}

/// # Errors produced by the event bus.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Queued delivery needs a Tokio runtime and none was available.
    #[error("no tokio runtime available for queued delivery")]
    NoRuntime,
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::NoRuntime => "bus_no_runtime",
        }
    }
}

/// Renders a panic payload caught by `catch_unwind`.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
