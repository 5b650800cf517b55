//! Event dispatch - listeners, cancelable events, capture/target/bubble.
//!
//! Listeners are registered per target (`Document` or a node) and kind.
//! `dispatch_event` computes the propagation path once, up front, then walks
//! capture (document down to the parent), target, and bubble (parent up to
//! the document). A listener removed while an event is in flight does not
//! fire for that event.
//!
//! Handlers run untracked, so an event fired from inside an effect never
//! subscribes that effect to whatever the handler reads.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::untrack;

use super::arrays::core;
use crate::primitives::Cleanup;
use crate::state::keyboard::KeyboardEvent;
use crate::types::PointerType;

// =============================================================================
// TYPES
// =============================================================================

/// Where a listener is attached / an event is dispatched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Document,
    Node(usize),
}

impl From<usize> for EventTarget {
    fn from(index: usize) -> Self {
        EventTarget::Node(index)
    }
}

/// Event type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    PointerDown,
    MouseDown,
    Click,
    FocusIn,
    FocusOut,
    Focus,
    Blur,
    KeyDown,
    AnimationStart,
    AnimationEnd,
    AnimationCancel,
    /// Synthetic events raised by the primitives themselves.
    Custom(&'static str),
}

impl EventKind {
    /// Default `(bubbles, cancelable)` for native kinds.
    fn defaults(self) -> (bool, bool) {
        match self {
            EventKind::PointerDown | EventKind::MouseDown | EventKind::Click | EventKind::KeyDown => {
                (true, true)
            }
            EventKind::FocusIn | EventKind::FocusOut => (true, false),
            EventKind::Focus | EventKind::Blur => (false, false),
            EventKind::AnimationStart | EventKind::AnimationEnd | EventKind::AnimationCancel => {
                (true, false)
            }
            EventKind::Custom(_) => (false, false),
        }
    }
}

/// Kind-specific payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum EventDetail {
    #[default]
    None,
    Key(KeyboardEvent),
    Pointer(PointerType),
    Animation(String),
}

/// A dispatched event.
///
/// Flags mutated by handlers (`prevent_default`, `stop_propagation`) are
/// interior-mutable so handlers receive `&Event`.
#[derive(Debug)]
pub struct Event {
    kind: EventKind,
    target: EventTarget,
    related_target: Option<usize>,
    detail: EventDetail,
    original: Option<Rc<Event>>,
    bubbles: bool,
    cancelable: bool,
    current_target: Cell<Option<EventTarget>>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    pub fn new(kind: EventKind, target: impl Into<EventTarget>) -> Self {
        let (bubbles, cancelable) = kind.defaults();
        Self {
            kind,
            target: target.into(),
            related_target: None,
            detail: EventDetail::None,
            original: None,
            bubbles,
            cancelable,
            current_target: Cell::new(None),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    pub fn with_bubbles(mut self, bubbles: bool) -> Self {
        self.bubbles = bubbles;
        self
    }

    pub fn with_cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }

    pub fn with_related_target(mut self, related: Option<usize>) -> Self {
        self.related_target = related;
        self
    }

    pub fn with_detail(mut self, detail: EventDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Attach the native event a synthetic event was raised for.
    pub fn with_original(mut self, original: Rc<Event>) -> Self {
        self.original = Some(original);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn target(&self) -> EventTarget {
        self.target
    }

    /// Target node, `None` when dispatched at the document.
    pub fn target_node(&self) -> Option<usize> {
        match self.target {
            EventTarget::Node(index) => Some(index),
            EventTarget::Document => None,
        }
    }

    pub fn related_target(&self) -> Option<usize> {
        self.related_target
    }

    pub fn current_target(&self) -> Option<EventTarget> {
        self.current_target.get()
    }

    pub fn detail(&self) -> &EventDetail {
        &self.detail
    }

    pub fn key(&self) -> Option<&KeyboardEvent> {
        match &self.detail {
            EventDetail::Key(key) => Some(key),
            _ => None,
        }
    }

    pub fn pointer_type(&self) -> Option<PointerType> {
        match self.detail {
            EventDetail::Pointer(pointer_type) => Some(pointer_type),
            _ => None,
        }
    }

    pub fn animation_name(&self) -> Option<&str> {
        match &self.detail {
            EventDetail::Animation(name) => Some(name),
            _ => None,
        }
    }

    pub fn original_event(&self) -> Option<&Rc<Event>> {
        self.original.as_ref()
    }

    /// Copy of the event's data with fresh dispatch flags, for keeping an
    /// event around after its dispatch has finished.
    pub fn snapshot(&self) -> Event {
        Event {
            kind: self.kind,
            target: self.target,
            related_target: self.related_target,
            detail: self.detail.clone(),
            original: self.original.clone(),
            bubbles: self.bubbles,
            cancelable: self.cancelable,
            current_target: Cell::new(None),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    /// No-op on non-cancelable events.
    pub fn prevent_default(&self) {
        if self.cancelable {
            self.default_prevented.set(true);
        }
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

/// Handler for dispatched events.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// Listener registration options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self { capture: true, once: false }
    }

    pub fn once() -> Self {
        Self { capture: false, once: true }
    }
}

/// Handle used to remove a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

// =============================================================================
// LISTENER REGISTRY
// =============================================================================

struct Listener {
    id: usize,
    target: EventTarget,
    kind: EventKind,
    options: ListenerOptions,
    handler: EventHandler,
}

struct ListenerRegistry {
    listeners: Vec<Listener>,
    next_id: usize,
}

impl ListenerRegistry {
    fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

thread_local! {
    static REGISTRY: RefCell<ListenerRegistry> = RefCell::new(ListenerRegistry::new());
}

/// Register a listener. Returns its id for removal.
pub fn add_event_listener(
    target: impl Into<EventTarget>,
    kind: EventKind,
    options: ListenerOptions,
    handler: impl Fn(&Event) + 'static,
) -> ListenerId {
    let target = target.into();
    REGISTRY.with(|reg| {
        let mut reg = reg.borrow_mut();
        let id = reg.next_id;
        reg.next_id += 1;
        reg.listeners.push(Listener {
            id,
            target,
            kind,
            options,
            handler: Rc::new(handler),
        });
        ListenerId(id)
    })
}

/// Remove a listener. Removing twice is a no-op.
pub fn remove_event_listener(id: ListenerId) {
    REGISTRY.with(|reg| {
        reg.borrow_mut().listeners.retain(|l| l.id != id.0);
    });
}

/// Register a listener and return a cleanup that removes exactly it.
pub fn listen(
    target: impl Into<EventTarget>,
    kind: EventKind,
    options: ListenerOptions,
    handler: impl Fn(&Event) + 'static,
) -> Cleanup {
    let id = add_event_listener(target, kind, options, handler);
    Box::new(move || remove_event_listener(id))
}

/// Drop every listener attached to a node (called on release).
pub(crate) fn remove_listeners_for(index: usize) {
    REGISTRY.with(|reg| {
        reg.borrow_mut()
            .listeners
            .retain(|l| l.target != EventTarget::Node(index));
    });
}

/// Number of listeners currently registered on a target.
pub fn listener_count(target: impl Into<EventTarget>, kind: EventKind) -> usize {
    let target = target.into();
    REGISTRY.with(|reg| {
        reg.borrow()
            .listeners
            .iter()
            .filter(|l| l.target == target && l.kind == kind)
            .count()
    })
}

/// Reset all listeners (for testing).
pub fn reset_events() {
    REGISTRY.with(|reg| *reg.borrow_mut() = ListenerRegistry::new());
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Propagation path from the target up to the document (target first).
fn propagation_path(target: EventTarget) -> Vec<EventTarget> {
    let EventTarget::Node(index) = target else {
        return vec![EventTarget::Document];
    };
    let mut path = vec![EventTarget::Node(index)];
    let mut current = index;
    while let Some(parent) = core::get_parent_index(current) {
        path.push(EventTarget::Node(parent));
        current = parent;
    }
    if super::is_connected(index) {
        path.push(EventTarget::Document);
    }
    path
}

/// Invoke matching listeners on one target. `capture: None` runs both
/// capture and bubble listeners (target phase, capture first).
fn invoke(event: &Event, current: EventTarget, capture: Option<bool>) {
    let matching: Vec<usize> = REGISTRY.with(|reg| {
        let reg = reg.borrow();
        let mut ids: Vec<(bool, usize)> = reg
            .listeners
            .iter()
            .filter(|l| l.target == current && l.kind == event.kind)
            .filter(|l| capture.is_none_or(|c| l.options.capture == c))
            .map(|l| (!l.options.capture, l.id))
            .collect();
        // Stable: capture listeners first, registration order within.
        ids.sort_by_key(|(bubble, _)| *bubble);
        ids.into_iter().map(|(_, id)| id).collect()
    });

    event.current_target.set(Some(current));
    for id in matching {
        let handler = REGISTRY.with(|reg| {
            let mut reg = reg.borrow_mut();
            let pos = reg.listeners.iter().position(|l| l.id == id)?;
            let handler = reg.listeners[pos].handler.clone();
            if reg.listeners[pos].options.once {
                reg.listeners.remove(pos);
            }
            Some(handler)
        });
        if let Some(handler) = handler {
            untrack(|| handler(event));
        }
    }
    event.current_target.set(None);
}

/// Dispatch an event. Returns `false` if a handler prevented its default.
pub fn dispatch_event(event: &Event) -> bool {
    let path = propagation_path(event.target);

    // Capture: document down to the target's parent.
    for &current in path.iter().skip(1).rev() {
        invoke(event, current, Some(true));
        if event.is_propagation_stopped() {
            return !event.is_default_prevented();
        }
    }

    invoke(event, event.target, None);
    if event.is_propagation_stopped() || !event.bubbles {
        return !event.is_default_prevented();
    }

    // Bubble: target's parent up to the document.
    for &current in path.iter().skip(1) {
        invoke(event, current, Some(false));
        if event.is_propagation_stopped() {
            break;
        }
    }

    !event.is_default_prevented()
}
