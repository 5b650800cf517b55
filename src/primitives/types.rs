//! Primitive types - Props, callbacks, node refs and cleanup.
//!
//! These types define the interface for component props.
//! Props support static values, signals, and getters for reactivity.

use std::rc::Rc;

use spark_signals::{signal, untrack, Signal};

use crate::engine::events::{Event, EventKind, ListenerOptions};

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by components.
///
/// Call this to unmount the component and release resources.
pub type Cleanup = Box<dyn FnOnce()>;

/// A cleanup that does nothing.
pub fn noop_cleanup() -> Cleanup {
    Box::new(|| {})
}

/// Run several cleanups as one, last registered first.
pub fn combine_cleanups(cleanups: Vec<Cleanup>) -> Cleanup {
    Box::new(move || {
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    })
}

// =============================================================================
// Callback Types
// =============================================================================

/// Event callback type (Rc for shared ownership in closures).
pub type EventCallback = Rc<dyn Fn(&Event)>;

/// Value change callback.
pub type ChangeCallback<T> = Rc<dyn Fn(T)>;

/// Callback with no payload (`on_dismiss`, ...).
pub type VoidCallback = Rc<dyn Fn()>;

/// Reactive getter for a prop that may be left uncontrolled.
///
/// `None` from the getter means "uncontrolled right now".
pub type MaybeControlled<T> = Rc<dyn Fn() -> Option<T>>;

/// Children render function. Runs once, inside the parent's context.
pub type Children = Box<dyn FnOnce()>;

// =============================================================================
// Prop Value - Reactive property wrapper
// =============================================================================

/// A property value that can be static, a signal, or a getter.
///
/// This enables reactive props while maintaining type safety.
/// When bound to a node, the reactive connection is preserved.
#[derive(Clone)]
pub enum PropValue<T: Clone + PartialEq + 'static> {
    /// Static value (not reactive).
    Static(T),
    /// Reactive signal (changes propagate automatically).
    Signal(Signal<T>),
    /// Getter function (called each time value is needed).
    Getter(Rc<dyn Fn() -> T>),
}

impl<T: Clone + PartialEq + 'static> PropValue<T> {
    /// Get the current value (for immediate reads).
    pub fn get(&self) -> T {
        match self {
            PropValue::Static(v) => v.clone(),
            PropValue::Signal(s) => s.get(),
            PropValue::Getter(f) => f(),
        }
    }

    /// Wrap a getter closure.
    pub fn getter(f: impl Fn() -> T + 'static) -> Self {
        PropValue::Getter(Rc::new(f))
    }

    pub fn is_static(&self) -> bool {
        matches!(self, PropValue::Static(_))
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for PropValue<T> {
    fn default() -> Self {
        PropValue::Static(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> From<T> for PropValue<T> {
    fn from(value: T) -> Self {
        PropValue::Static(value)
    }
}

impl<T: Clone + PartialEq + 'static> From<Signal<T>> for PropValue<T> {
    fn from(signal: Signal<T>) -> Self {
        PropValue::Signal(signal)
    }
}

impl From<&str> for PropValue<Option<String>> {
    fn from(value: &str) -> Self {
        PropValue::Static(Some(value.to_string()))
    }
}

impl From<String> for PropValue<Option<String>> {
    fn from(value: String) -> Self {
        PropValue::Static(Some(value))
    }
}

// =============================================================================
// Node Ref
// =============================================================================

/// A reactive handle to the node a component rendered.
///
/// Set when the node is created, cleared when it is released. Reading with
/// [`NodeRef::get`] inside an effect re-runs the effect when the node changes.
#[derive(Clone)]
pub struct NodeRef(Signal<Option<usize>>);

impl NodeRef {
    pub fn new() -> Self {
        NodeRef(signal(None))
    }

    /// Current node (tracked).
    pub fn get(&self) -> Option<usize> {
        self.0.get()
    }

    /// Current node without creating a dependency.
    pub fn peek(&self) -> Option<usize> {
        untrack(|| self.0.get())
    }

    pub fn set(&self, node: Option<usize>) {
        self.0.set(node);
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Listener Prop
// =============================================================================

/// An event listener attached to a node while its component is mounted.
#[derive(Clone)]
pub struct PropListener {
    pub kind: EventKind,
    pub options: ListenerOptions,
    pub handler: EventCallback,
}

impl PropListener {
    pub fn new(kind: EventKind, handler: impl Fn(&Event) + 'static) -> Self {
        Self {
            kind,
            options: ListenerOptions::default(),
            handler: Rc::new(handler),
        }
    }

    pub fn capture(kind: EventKind, handler: impl Fn(&Event) + 'static) -> Self {
        Self {
            kind,
            options: ListenerOptions::capture(),
            handler: Rc::new(handler),
        }
    }
}
