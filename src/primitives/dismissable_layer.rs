//! Dismissable Layer - outside interaction and Escape dismissal for stacked overlays.
//!
//! Every mounted layer is pushed on one thread-wide stack. The stack also
//! holds the layers that disabled outside pointer events and the branch
//! nodes that count as "inside" for every layer.
//!
//! # Pointer-events rule
//!
//! While any layer disables outside pointer events, `body` gets
//! `pointer-events: none` and each layer gets:
//!
//! ```text
//! index >= index of the highest disabling layer  → auto
//! otherwise                                      → none
//! ```
//!
//! The stack carries a version signal, so layer styles recompute whenever
//! a layer mounts or unmounts.
//!
//! # Outside interaction
//!
//! Document `PointerDown` / `FocusIn` listeners are attached after a
//! zero-delay timer, so the gesture that opened the layer never counts as
//! outside it. Capture listeners on the layer mark interactions that started
//! inside. An outside interaction raises a cancelable custom event on the
//! original target; handlers see it first and `on_dismiss` runs unless one
//! of them prevented it.
//!
//! Touch pointers defer the outside check to the next document `Click`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{signal, untrack, Signal};

use super::element::ElementProps;
use super::owner::owned;
use super::slot::RenderAs;
use super::types::{Children, Cleanup, EventCallback, NodeRef, VoidCallback};
use crate::engine::arrays::style;
use crate::engine::events::{dispatch_event, listen, Event, EventKind, EventTarget, ListenerOptions};
use crate::engine::scheduler::timeout;
use crate::engine::{body, contains};
use crate::state::environment::is_server;
use crate::types::{PointerEvents, PointerType};

/// Custom event raised on the target of an outside pointer-down.
pub const POINTER_DOWN_OUTSIDE: &str = "dismissableLayer.pointerDownOutside";
/// Custom event raised on the target of an outside focus move.
pub const FOCUS_OUTSIDE: &str = "dismissableLayer.focusOutside";

// =============================================================================
// Layer Stack
// =============================================================================

#[derive(Default)]
struct LayerStack {
    /// Mounted layers, oldest first.
    layers: Vec<usize>,
    /// Layers that disabled outside pointer events, oldest first.
    disabled: Vec<usize>,
    branches: Vec<usize>,
    /// `body` pointer-events before the first disabling layer mounted.
    original_body_pointer_events: Option<PointerEvents>,
}

impl LayerStack {
    fn index_of(&self, node: usize) -> Option<usize> {
        self.layers.iter().position(|&layer| layer == node)
    }

    fn highest_disabled_index(&self) -> Option<usize> {
        self.disabled.last().and_then(|&layer| self.index_of(layer))
    }

    fn pointer_events_enabled(&self, node: usize) -> bool {
        match (self.index_of(node), self.highest_disabled_index()) {
            (Some(index), Some(highest)) => index >= highest,
            _ => true,
        }
    }

    fn in_branch(&self, target: EventTarget) -> bool {
        let EventTarget::Node(node) = target else {
            return false;
        };
        self.branches.iter().any(|&branch| contains(branch, node))
    }
}

thread_local! {
    static STACK: RefCell<LayerStack> = RefCell::new(LayerStack::default());
    static VERSION: Signal<u64> = signal(0);
}

fn with_stack<R>(f: impl FnOnce(&mut LayerStack) -> R) -> R {
    STACK.with(|stack| f(&mut stack.borrow_mut()))
}

fn bump_version() {
    VERSION.with(|version| version.set(untrack(|| version.get()) + 1));
}

fn push_layer(node: usize, disable_outside_pointer_events: bool) {
    with_stack(|stack| {
        if disable_outside_pointer_events {
            if stack.disabled.is_empty() {
                let body = body();
                stack.original_body_pointer_events = style::get_pointer_events(body);
                style::set_pointer_events(body, Some(PointerEvents::None));
            }
            stack.disabled.push(node);
        }
        stack.layers.push(node);
    });
    log::debug!("dismissable layer {node} mounted ({} layers)", layer_count());
    bump_version();
}

fn remove_layer(node: usize) {
    with_stack(|stack| {
        stack.layers.retain(|&layer| layer != node);
        let was_disabling = stack.disabled.contains(&node);
        stack.disabled.retain(|&layer| layer != node);
        if was_disabling && stack.disabled.is_empty() {
            style::set_pointer_events(body(), stack.original_body_pointer_events.take());
        }
    });
    log::debug!("dismissable layer {node} unmounted ({} layers)", layer_count());
    bump_version();
}

/// Pointer-events a layer should carry right now (tracked).
fn layer_pointer_events(node: usize) -> Option<PointerEvents> {
    VERSION.with(|version| version.get());
    with_stack(|stack| {
        if stack.disabled.is_empty() || stack.index_of(node).is_none() {
            return None;
        }
        Some(if stack.pointer_events_enabled(node) {
            PointerEvents::Auto
        } else {
            PointerEvents::None
        })
    })
}

/// Number of mounted layers.
pub fn layer_count() -> usize {
    with_stack(|stack| stack.layers.len())
}

/// Number of mounted branches.
pub fn branch_count() -> usize {
    with_stack(|stack| stack.branches.len())
}

/// Whether `node` is the topmost mounted layer.
pub fn is_highest_layer(node: usize) -> bool {
    with_stack(|stack| stack.layers.last() == Some(&node))
}

/// Clear the layer stack (for testing). Does not touch node styles.
pub fn reset_layer_stack() {
    with_stack(|stack| *stack = LayerStack::default());
    VERSION.with(|version| version.set(0));
}

// =============================================================================
// Props
// =============================================================================

/// Properties for [`dismissable_layer`].
#[derive(Default)]
pub struct DismissableLayerProps {
    /// Make everything below this layer (and outside all layers) inert to
    /// the pointer while it is mounted.
    pub disable_outside_pointer_events: bool,
    /// Escape pressed while this is the topmost layer. Prevent default to
    /// keep the layer open.
    pub on_escape_key_down: Option<EventCallback>,
    pub on_pointer_down_outside: Option<EventCallback>,
    pub on_focus_outside: Option<EventCallback>,
    /// Runs after either outside handler.
    pub on_interact_outside: Option<EventCallback>,
    pub on_dismiss: Option<VoidCallback>,
    pub node_ref: Option<NodeRef>,
    pub render_as: RenderAs,
    pub children: Option<Children>,
}

/// Properties for [`dismissable_layer_branch`].
#[derive(Default)]
pub struct DismissableLayerBranchProps {
    pub node_ref: Option<NodeRef>,
    pub render_as: RenderAs,
    pub children: Option<Children>,
}

struct LayerHandlers {
    node: usize,
    on_escape_key_down: Option<EventCallback>,
    on_pointer_down_outside: Option<EventCallback>,
    on_focus_outside: Option<EventCallback>,
    on_interact_outside: Option<EventCallback>,
    on_dismiss: Option<VoidCallback>,
}

impl LayerHandlers {
    /// Raise `name` on `target` with the outside handlers attached to it.
    fn dispatch_outside(self: &Rc<Self>, name: &'static str, original: Rc<Event>, specific: Option<EventCallback>) {
        let target = original.target();
        let handlers = self.clone();
        let _listener = listen(target, EventKind::Custom(name), ListenerOptions::once(), move |event: &Event| {
            if let Some(handler) = &specific {
                handler(event);
            }
            if let Some(handler) = &handlers.on_interact_outside {
                handler(event);
            }
            if !event.is_default_prevented() {
                if let Some(on_dismiss) = &handlers.on_dismiss {
                    on_dismiss();
                }
            }
        });
        let event = Event::new(EventKind::Custom(name), target)
            .with_bubbles(false)
            .with_cancelable(true)
            .with_original(original);
        dispatch_event(&event);
    }

    fn pointer_down_outside(self: &Rc<Self>, original: Rc<Event>) {
        let skip = with_stack(|stack| {
            !stack.pointer_events_enabled(self.node) || stack.in_branch(original.target())
        });
        if skip {
            return;
        }
        self.dispatch_outside(POINTER_DOWN_OUTSIDE, original, self.on_pointer_down_outside.clone());
    }

    fn focus_outside(self: &Rc<Self>, original: Rc<Event>) {
        if with_stack(|stack| stack.in_branch(original.target())) {
            return;
        }
        self.dispatch_outside(FOCUS_OUTSIDE, original, self.on_focus_outside.clone());
    }

    fn escape_key_down(&self, event: &Event) {
        if event.key().is_none_or(|key| key.key != "Escape") || !is_highest_layer(self.node) {
            return;
        }
        if let Some(handler) = &self.on_escape_key_down {
            handler(event);
        }
        if !event.is_default_prevented() {
            if let Some(on_dismiss) = &self.on_dismiss {
                event.prevent_default();
                on_dismiss();
            }
        }
    }
}

// =============================================================================
// Components
// =============================================================================

/// Outside-detection listeners on the document, attached one macrotask
/// after mount.
fn watch_outside(handlers: Rc<LayerHandlers>, pointer_inside: Rc<Cell<bool>>, focus_inside: Rc<Cell<bool>>) -> Cleanup {
    let listeners: Rc<RefCell<Vec<Cleanup>>> = Rc::default();
    let pending_click: Rc<RefCell<Option<Cleanup>>> = Rc::default();

    let listeners_for_timer = listeners.clone();
    let pending_for_timer = pending_click.clone();
    let cancel_timer = timeout(
        move || {
            let pointer_handlers = handlers.clone();
            let pending_click = pending_for_timer;
            let on_pointer_down = listen(
                EventTarget::Document,
                EventKind::PointerDown,
                ListenerOptions::default(),
                move |event: &Event| {
                    if let Some(cancel) = pending_click.borrow_mut().take() {
                        cancel();
                    }
                    if !pointer_inside.get() {
                        let original = Rc::new(event.snapshot());
                        if event.pointer_type() == Some(PointerType::Touch) {
                            let handlers = pointer_handlers.clone();
                            let on_click = listen(
                                EventTarget::Document,
                                EventKind::Click,
                                ListenerOptions::once(),
                                move |_| handlers.pointer_down_outside(original.clone()),
                            );
                            *pending_click.borrow_mut() = Some(on_click);
                        } else {
                            pointer_handlers.pointer_down_outside(original);
                        }
                    }
                    pointer_inside.set(false);
                },
            );

            let focus_handlers = handlers;
            let on_focus_in = listen(
                EventTarget::Document,
                EventKind::FocusIn,
                ListenerOptions::default(),
                move |event: &Event| {
                    if !focus_inside.get() {
                        focus_handlers.focus_outside(Rc::new(event.snapshot()));
                    }
                },
            );
            listeners_for_timer.borrow_mut().extend([on_pointer_down, on_focus_in]);
        },
        0,
    );

    Box::new(move || {
        cancel_timer();
        for cleanup in listeners.borrow_mut().drain(..) {
            cleanup();
        }
        if let Some(cancel) = pending_click.borrow_mut().take() {
            cancel();
        }
    })
}

/// Mount a dismissable layer.
pub fn dismissable_layer(props: DismissableLayerProps) -> Cleanup {
    let DismissableLayerProps {
        disable_outside_pointer_events,
        on_escape_key_down,
        on_pointer_down_outside,
        on_focus_outside,
        on_interact_outside,
        on_dismiss,
        node_ref,
        render_as,
        children,
    } = props;

    let node_ref = node_ref.unwrap_or_default();
    let pointer_inside = Rc::new(Cell::new(false));
    let focus_inside = Rc::new(Cell::new(false));

    let mut element = ElementProps::new("div")
        .attr("data-dismissable-layer", "")
        .node_ref(node_ref.clone())
        .pointer_events_with({
            let node_ref = node_ref.clone();
            move || node_ref.get().and_then(layer_pointer_events)
        })
        .on_capture(EventKind::PointerDown, {
            let pointer_inside = pointer_inside.clone();
            move |_| pointer_inside.set(true)
        })
        .on_capture(EventKind::FocusIn, {
            let focus_inside = focus_inside.clone();
            move |_| focus_inside.set(true)
        })
        .on_capture(EventKind::FocusOut, {
            let focus_inside = focus_inside.clone();
            move |_| focus_inside.set(false)
        });
    element.children = children;

    let rendered = render_as.render(element);
    let Some(node) = node_ref.peek() else {
        log::warn!("DismissableLayer rendered without attaching its node ref");
        return rendered;
    };
    if is_server() {
        return rendered;
    }

    push_layer(node, disable_outside_pointer_events);

    let handlers = Rc::new(LayerHandlers {
        node,
        on_escape_key_down,
        on_pointer_down_outside,
        on_focus_outside,
        on_interact_outside,
        on_dismiss,
    });

    let escape_handlers = handlers.clone();
    let stop_escape = listen(
        EventTarget::Document,
        EventKind::KeyDown,
        ListenerOptions::capture(),
        move |event: &Event| escape_handlers.escape_key_down(event),
    );
    let stop_outside = watch_outside(handlers, pointer_inside, focus_inside);

    owned(Box::new(move || {
        stop_escape();
        stop_outside();
        remove_layer(node);
        rendered();
    }))
}

/// Mount a region that never counts as outside any layer.
pub fn dismissable_layer_branch(props: DismissableLayerBranchProps) -> Cleanup {
    let DismissableLayerBranchProps {
        node_ref,
        render_as,
        children,
    } = props;

    let node_ref = node_ref.unwrap_or_default();
    let mut element = ElementProps::new("div").node_ref(node_ref.clone());
    element.children = children;

    let rendered = render_as.render(element);
    let Some(node) = node_ref.peek() else {
        return rendered;
    };
    if is_server() {
        return rendered;
    }

    with_stack(|stack| stack.branches.push(node));
    owned(Box::new(move || {
        with_stack(|stack| stack.branches.retain(|&branch| branch != node));
        rendered();
    }))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::create_node;
    use crate::engine::scheduler::flush;
    use crate::state::environment::set_environment;
    use crate::state::focus::{focus, focused_node};
    use crate::state::keyboard::{key_down, KeyboardEvent};
    use crate::state::pointer::{click, pointer_down};
    use crate::types::Environment;

    fn setup() {
        crate::reset_all();
    }

    fn counter() -> (VoidCallback, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        (Rc::new(move || count_clone.set(count_clone.get() + 1)), count)
    }

    fn mount_layer(props: DismissableLayerProps) -> (usize, Cleanup) {
        let node_ref = NodeRef::new();
        let cleanup = dismissable_layer(DismissableLayerProps {
            node_ref: Some(node_ref.clone()),
            ..props
        });
        (node_ref.peek().unwrap(), cleanup)
    }

    #[test]
    fn test_outside_pointer_down_dismisses_once() {
        setup();

        let (on_dismiss, dismissed) = counter();
        let (layer, _cleanup) = mount_layer(DismissableLayerProps {
            on_dismiss: Some(on_dismiss),
            ..Default::default()
        });
        let outside = create_node("div", None);
        let inside = crate::engine::with_parent(layer, || create_node("div", None));

        // Listeners are not attached yet.
        pointer_down(outside, PointerType::Mouse);
        assert_eq!(dismissed.get(), 0);

        flush();
        pointer_down(inside, PointerType::Mouse);
        assert_eq!(dismissed.get(), 0);
        pointer_down(outside, PointerType::Mouse);
        assert_eq!(dismissed.get(), 1);
    }

    #[test]
    fn test_branch_is_inside() {
        setup();

        let (on_dismiss, dismissed) = counter();
        let _layer = mount_layer(DismissableLayerProps {
            on_dismiss: Some(on_dismiss),
            ..Default::default()
        });
        let branch_ref = NodeRef::new();
        let _branch = dismissable_layer_branch(DismissableLayerBranchProps {
            node_ref: Some(branch_ref.clone()),
            ..Default::default()
        });
        let branch = branch_ref.peek().unwrap();
        let toast = crate::engine::with_parent(branch, || create_node("div", None));
        assert_eq!(branch_count(), 1);

        flush();
        pointer_down(toast, PointerType::Mouse);
        assert_eq!(dismissed.get(), 0);
    }

    #[test]
    fn test_prevented_outside_event_keeps_layer() {
        setup();

        let (on_dismiss, dismissed) = counter();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let _layer = mount_layer(DismissableLayerProps {
            on_pointer_down_outside: Some(Rc::new(move |event: &Event| {
                seen_clone.borrow_mut().push((event.kind(), event.original_event().map(|e| e.kind())));
                event.prevent_default();
            })),
            on_dismiss: Some(on_dismiss),
            ..Default::default()
        });
        let outside = create_node("div", None);

        flush();
        pointer_down(outside, PointerType::Mouse);
        assert_eq!(dismissed.get(), 0);
        assert_eq!(
            *seen.borrow(),
            vec![(EventKind::Custom(POINTER_DOWN_OUTSIDE), Some(EventKind::PointerDown))]
        );
    }

    #[test]
    fn test_touch_waits_for_click() {
        setup();

        let (on_dismiss, dismissed) = counter();
        let _layer = mount_layer(DismissableLayerProps {
            on_dismiss: Some(on_dismiss),
            ..Default::default()
        });
        let outside = create_node("div", None);

        flush();
        pointer_down(outside, PointerType::Touch);
        assert_eq!(dismissed.get(), 0);
        click(outside);
        assert_eq!(dismissed.get(), 1);
        click(outside);
        assert_eq!(dismissed.get(), 1);
    }

    #[test]
    fn test_focus_outside_dismisses() {
        setup();

        let (on_dismiss, dismissed) = counter();
        let interactions = Rc::new(Cell::new(0));
        let interactions_clone = interactions.clone();
        let (layer, _cleanup) = mount_layer(DismissableLayerProps {
            on_interact_outside: Some(Rc::new(move |_| interactions_clone.set(interactions_clone.get() + 1))),
            on_dismiss: Some(on_dismiss),
            ..Default::default()
        });
        let inside = crate::engine::with_parent(layer, || create_node("button", None));
        let other_inside = crate::engine::with_parent(layer, || create_node("button", None));
        let outside = create_node("button", None);

        flush();
        focus(inside);
        focus(other_inside);
        assert_eq!(dismissed.get(), 0);

        focus(outside);
        assert_eq!(dismissed.get(), 1);
        assert_eq!(interactions.get(), 1);
        assert_eq!(focused_node(), Some(outside));
    }

    #[test]
    fn test_outside_pointer_events_disabled_stacking() {
        setup();

        style::set_pointer_events(body(), Some(PointerEvents::Auto));
        let (first, _first_cleanup) = mount_layer(DismissableLayerProps::default());
        assert_eq!(style::get_pointer_events(first), None);

        let (modal, modal_cleanup) = mount_layer(DismissableLayerProps {
            disable_outside_pointer_events: true,
            ..Default::default()
        });
        let (top, top_cleanup) = mount_layer(DismissableLayerProps::default());

        assert_eq!(style::get_pointer_events(body()), Some(PointerEvents::None));
        assert_eq!(style::get_pointer_events(first), Some(PointerEvents::None));
        assert_eq!(style::get_pointer_events(modal), Some(PointerEvents::Auto));
        assert_eq!(style::get_pointer_events(top), Some(PointerEvents::Auto));

        top_cleanup();
        modal_cleanup();
        assert_eq!(style::get_pointer_events(body()), Some(PointerEvents::Auto));
        assert_eq!(style::get_pointer_events(first), None);
        assert_eq!(layer_count(), 1);
    }

    #[test]
    fn test_layer_below_modal_ignores_outside_pointer() {
        setup();

        let (below_dismiss, below_dismissed) = counter();
        let (modal_dismiss, modal_dismissed) = counter();
        let _below = mount_layer(DismissableLayerProps {
            on_dismiss: Some(below_dismiss),
            ..Default::default()
        });
        let _modal = mount_layer(DismissableLayerProps {
            disable_outside_pointer_events: true,
            on_dismiss: Some(modal_dismiss),
            ..Default::default()
        });
        let outside = create_node("div", None);

        flush();
        pointer_down(outside, PointerType::Mouse);
        assert_eq!(modal_dismissed.get(), 1);
        assert_eq!(below_dismissed.get(), 0);
    }

    #[test]
    fn test_escape_only_reaches_highest_layer() {
        setup();

        let (lower_dismiss, lower_dismissed) = counter();
        let (upper_dismiss, upper_dismissed) = counter();
        let (lower, _lower_cleanup) = mount_layer(DismissableLayerProps {
            on_dismiss: Some(lower_dismiss),
            ..Default::default()
        });
        let (upper, upper_cleanup) = mount_layer(DismissableLayerProps {
            on_dismiss: Some(upper_dismiss),
            ..Default::default()
        });
        assert!(is_highest_layer(upper));
        assert!(!is_highest_layer(lower));

        assert!(!key_down(KeyboardEvent::new("Escape")));
        assert_eq!((lower_dismissed.get(), upper_dismissed.get()), (0, 1));

        upper_cleanup();
        key_down(KeyboardEvent::new("Escape"));
        assert_eq!((lower_dismissed.get(), upper_dismissed.get()), (1, 1));
    }

    #[test]
    fn test_cleanup_removes_document_listeners() {
        setup();

        let (on_dismiss, dismissed) = counter();
        let (_layer, cleanup) = mount_layer(DismissableLayerProps {
            on_dismiss: Some(on_dismiss),
            ..Default::default()
        });
        flush();
        cleanup();

        assert_eq!(layer_count(), 0);
        assert_eq!(crate::engine::events::listener_count(EventTarget::Document, EventKind::PointerDown), 0);
        assert_eq!(crate::engine::events::listener_count(EventTarget::Document, EventKind::KeyDown), 0);
        pointer_down(create_node("div", None), PointerType::Mouse);
        assert_eq!(dismissed.get(), 0);
    }

    #[test]
    fn test_server_render_skips_stack() {
        setup();

        set_environment(Environment::Server);
        let (_layer, _cleanup) = mount_layer(DismissableLayerProps {
            disable_outside_pointer_events: true,
            ..Default::default()
        });
        assert_eq!(layer_count(), 0);
        assert_eq!(style::get_pointer_events(body()), None);
    }
}
