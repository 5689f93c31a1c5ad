//! # Event kinds and the inheritance rule.
//!
//! An [`EventKind`] is a static declaration: a stable dotted name plus an
//! optional parent kind. A subscription for kind `K` receives events of `K`
//! and of every kind whose ancestor chain contains `K`.
//!
//! ```text
//! event
//!  ├─ file ──────────┬─ file.opened
//!  │                 ├─ file.saved
//!  │                 └─ file.closed
//!  ├─ editor ────────┬─ editor.text_changed
//!  │                 ├─ editor.selection_changed
//!  │                 └─ editor.cursor_moved
//!  ├─ search ────────┬─ search.performed
//!  │                 └─ search.replaced
//!  ├─ command ───────┬─ command.executed
//!  │                 └─ command.failed
//!  ├─ component ─────┬─ component.loaded
//!  │                 └─ component.unloaded
//!  └─ bus ───────────┬─ bus.handler_failed
//!                    └─ bus.subscriber_overflow
//! ```
//!
//! ## Rules
//! - Identity is the name: two kinds with the same name are the same kind.
//! - Names must be unique: redeclaring a name under another parent is a bug.
//!   Routing would merge both kinds while their ancestries differ; debug
//!   builds assert on it at subscribe time.
//! - Chains are built from `&'static` references, so they are finite and acyclic.
//! - Matching is a walk up the parent chain; no runtime type introspection.
//!
//! ## Example
//! ```rust
//! use tino_core::EventKind;
//! use tino_core::kinds;
//!
//! const PLUGIN: EventKind = EventKind::child("plugin", &kinds::EVENT);
//! const PLUGIN_LOADED: EventKind = EventKind::child("plugin.loaded", &PLUGIN);
//!
//! assert!(PLUGIN_LOADED.is_a(&PLUGIN));
//! assert!(PLUGIN_LOADED.is_a(&kinds::EVENT));
//! assert!(!PLUGIN.is_a(&PLUGIN_LOADED));
//! assert!(!kinds::FILE_SAVED.is_a(&PLUGIN));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

/// Statically declared event discriminant with an optional parent.
#[derive(Clone, Copy)]
pub struct EventKind {
    name: &'static str,
    parent: Option<&'static EventKind>,
}

impl EventKind {
    /// Declares a kind without a parent.
    pub const fn root(name: &'static str) -> Self {
        Self { name, parent: None }
    }

    /// Declares a kind refining `parent`.
    pub const fn child(name: &'static str, parent: &'static EventKind) -> Self {
        Self {
            name,
            parent: Some(parent),
        }
    }

    /// Stable identifier.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Direct parent, if any.
    #[inline]
    pub fn parent(&self) -> Option<EventKind> {
        self.parent.copied()
    }

    /// Iterates this kind followed by its ancestors (nearest first).
    pub fn ancestry(&self) -> Ancestry {
        Ancestry { next: Some(*self) }
    }

    /// Returns `true` if `self` is `other` or refines it.
    pub fn is_a(&self, other: &EventKind) -> bool {
        self.ancestry().any(|k| k == *other)
    }

    /// Number of ancestors (`0` for a root kind).
    pub fn depth(&self) -> usize {
        self.ancestry().count() - 1
    }
}

impl PartialEq for EventKind {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for EventKind {}

impl Hash for EventKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Iterator over a kind and its ancestors.
pub struct Ancestry {
    next: Option<EventKind>,
}

impl Iterator for Ancestry {
    type Item = EventKind;

    fn next(&mut self) -> Option<EventKind> {
        let current = self.next.take()?;
        self.next = current.parent();
        Some(current)
    }
}

/// Built-in kind vocabulary shared by the editor components.
///
/// Collaborators may declare further kinds, ideally as children of these.
pub mod kinds {
    use super::EventKind;

    /// Root of every built-in kind.
    pub const EVENT: EventKind = EventKind::root("event");

    // === File events ===
    /// Any file event.
    pub const FILE: EventKind = EventKind::child("file", &EVENT);
    /// A file was opened.
    pub const FILE_OPENED: EventKind = EventKind::child("file.opened", &FILE);
    /// A file was saved.
    pub const FILE_SAVED: EventKind = EventKind::child("file.saved", &FILE);
    /// A file was closed.
    pub const FILE_CLOSED: EventKind = EventKind::child("file.closed", &FILE);

    // === Editor events ===
    /// Any editor event.
    pub const EDITOR: EventKind = EventKind::child("editor", &EVENT);
    /// Buffer content changed.
    pub const TEXT_CHANGED: EventKind = EventKind::child("editor.text_changed", &EDITOR);
    /// Selection changed.
    pub const SELECTION_CHANGED: EventKind =
        EventKind::child("editor.selection_changed", &EDITOR);
    /// Cursor moved.
    pub const CURSOR_MOVED: EventKind = EventKind::child("editor.cursor_moved", &EDITOR);

    // === Search events ===
    /// Any search event.
    pub const SEARCH: EventKind = EventKind::child("search", &EVENT);
    /// A search ran.
    pub const SEARCH_PERFORMED: EventKind = EventKind::child("search.performed", &SEARCH);
    /// A replace ran.
    pub const REPLACE_PERFORMED: EventKind = EventKind::child("search.replaced", &SEARCH);

    // === Command events ===
    /// Any command event.
    pub const COMMAND: EventKind = EventKind::child("command", &EVENT);
    /// A command completed.
    pub const COMMAND_EXECUTED: EventKind = EventKind::child("command.executed", &COMMAND);
    /// A command failed.
    pub const COMMAND_FAILED: EventKind = EventKind::child("command.failed", &COMMAND);

    // === Component lifecycle (published by the registry) ===
    /// Any component lifecycle event.
    pub const COMPONENT: EventKind = EventKind::child("component", &EVENT);
    /// Payload: [`ComponentLoaded`](crate::ComponentLoaded).
    pub const COMPONENT_LOADED: EventKind = EventKind::child("component.loaded", &COMPONENT);
    /// Payload: [`ComponentUnloaded`](crate::ComponentUnloaded).
    pub const COMPONENT_UNLOADED: EventKind =
        EventKind::child("component.unloaded", &COMPONENT);

    // === Bus diagnostics (published by the bus) ===
    /// Any bus diagnostic event. Failures while handling these are never republished.
    pub const BUS: EventKind = EventKind::child("bus", &EVENT);
    /// Payload: [`HandlerFailure`](crate::HandlerFailure).
    pub const HANDLER_FAILED: EventKind = EventKind::child("bus.handler_failed", &BUS);
    /// Payload: [`SubscriberOverflow`](crate::SubscriberOverflow).
    pub const SUBSCRIBER_OVERFLOW: EventKind =
        EventKind::child("bus.subscriber_overflow", &BUS);
}

#[cfg(test)]
mod tests {
    use super::kinds::*;
    use super::*;

    #[test]
    fn test_ancestry_is_nearest_first() {
        let chain: Vec<&str> = FILE_SAVED.ancestry().map(|k| k.name()).collect();
        assert_eq!(chain, vec!["file.saved", "file", "event"]);
    }

    #[test]
    fn test_is_a_follows_parent_chain() {
        assert!(FILE_SAVED.is_a(&FILE_SAVED));
        assert!(FILE_SAVED.is_a(&FILE));
        assert!(FILE_SAVED.is_a(&EVENT));
        assert!(!FILE.is_a(&FILE_SAVED));
        assert!(!FILE_SAVED.is_a(&FILE_OPENED));
        assert!(!TEXT_CHANGED.is_a(&FILE));
    }

    #[test]
    fn test_identity_is_name() {
        const SAME: EventKind = EventKind::root("file.saved");
        assert_eq!(SAME, FILE_SAVED);
        assert_eq!(FILE.to_string(), "file");
        assert_eq!(format!("{:?}", CURSOR_MOVED), "editor.cursor_moved");
    }

    #[test]
    fn test_depth() {
        assert_eq!(EVENT.depth(), 0);
        assert_eq!(FILE.depth(), 1);
        assert_eq!(HANDLER_FAILED.depth(), 2);
        assert_eq!(HANDLER_FAILED.parent(), Some(BUS));
    }
}
