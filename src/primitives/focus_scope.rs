//! Focus Scope - auto-focus on mount/unmount, optional trapping and Tab looping.
//!
//! On mount, unless focus is already inside, a cancelable
//! [`AUTO_FOCUS_ON_MOUNT`] event is raised on the container; unless
//! prevented, focus moves to the first tabbable non-link descendant, or
//! the container itself. On unmount, one macrotask later, a cancelable
//! [`AUTO_FOCUS_ON_UNMOUNT`] event is handed to `on_unmount_auto_focus`;
//! unless prevented, focus returns to whatever held it before mount.
//!
//! While `trapped`:
//! - focus landing outside the container goes back to the last node
//!   focused inside it
//! - removing the focused node (focus falls to `body`) focuses the container
//!
//! Scopes form a thread-wide stack. Mounting a scope pauses the active one;
//! removing it resumes the next. Only an active scope traps or loops.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{effect, effect_scope, untrack};

use super::element::ElementProps;
use super::owner::owned;
use super::slot::RenderAs;
use super::types::{Children, Cleanup, EventCallback, NodeRef, PropValue};
use crate::engine::arrays::core;
use crate::engine::events::{dispatch_event, listen, Event, EventKind, EventTarget, ListenerOptions};
use crate::engine::observer::{disconnect, observe_removals};
use crate::engine::scheduler::set_timeout;
use crate::engine::{body, contains};
use crate::state::environment::is_server;
use crate::state::focus::{active_element, blur, focus, tabbable_nodes};
use crate::state::keyboard::Modifiers;

/// Raised on the container when the scope mounts without focus inside.
pub const AUTO_FOCUS_ON_MOUNT: &str = "focusScope.autoFocusOnMount";
/// Handed to `on_unmount_auto_focus` after the scope unmounts.
pub const AUTO_FOCUS_ON_UNMOUNT: &str = "focusScope.autoFocusOnUnmount";

// =============================================================================
// Scope Stack
// =============================================================================

struct ScopeRecord {
    paused: Cell<bool>,
}

thread_local! {
    /// Mounted scopes, active last.
    static SCOPES: RefCell<Vec<Rc<ScopeRecord>>> = const { RefCell::new(Vec::new()) };
}

fn push_scope(record: &Rc<ScopeRecord>) {
    SCOPES.with(|scopes| {
        let mut scopes = scopes.borrow_mut();
        if let Some(active) = scopes.last() {
            if !Rc::ptr_eq(active, record) {
                log::debug!("focus scope paused");
                active.paused.set(true);
            }
        }
        scopes.retain(|scope| !Rc::ptr_eq(scope, record));
        scopes.push(record.clone());
    });
}

fn remove_scope(record: &Rc<ScopeRecord>) {
    SCOPES.with(|scopes| {
        let mut scopes = scopes.borrow_mut();
        scopes.retain(|scope| !Rc::ptr_eq(scope, record));
        if let Some(active) = scopes.last() {
            log::debug!("focus scope resumed");
            active.paused.set(false);
        }
    });
}

/// Number of scopes on the stack (including ones waiting for their
/// unmount auto-focus).
pub fn focus_scope_count() -> usize {
    SCOPES.with(|scopes| scopes.borrow().len())
}

/// Clear the scope stack (for testing).
pub fn reset_focus_scope_stack() {
    SCOPES.with(|scopes| scopes.borrow_mut().clear());
}

// =============================================================================
// Helpers
// =============================================================================

fn remove_links(nodes: Vec<usize>) -> Vec<usize> {
    nodes.into_iter().filter(|&node| core::get_tag(node) != "a").collect()
}

fn focus_first(candidates: &[usize]) {
    let previously_focused = active_element();
    for &candidate in candidates {
        focus(candidate);
        if active_element() != previously_focused {
            return;
        }
    }
}

/// Focus `node`, treating `body` as "nobody".
fn restore_focus(node: usize) {
    if node == body() {
        blur();
    } else {
        focus(node);
    }
}

fn install_trap(container: usize, record: Rc<ScopeRecord>, last_focused: Rc<Cell<Option<usize>>>) -> Cleanup {
    let focus_in_record = record.clone();
    let focus_in_last = last_focused.clone();
    let stop_focus_in = listen(
        EventTarget::Document,
        EventKind::FocusIn,
        ListenerOptions::default(),
        move |event: &Event| {
            if focus_in_record.paused.get() {
                return;
            }
            let Some(target) = event.target_node() else { return };
            if contains(container, target) {
                focus_in_last.set(Some(target));
            } else if let Some(last) = focus_in_last.get() {
                focus(last);
            }
        },
    );

    let focus_out_record = record.clone();
    let stop_focus_out = listen(
        EventTarget::Document,
        EventKind::FocusOut,
        ListenerOptions::default(),
        move |event: &Event| {
            if focus_out_record.paused.get() {
                return;
            }
            // No related target: focus left the document or its node was removed.
            let Some(related) = event.related_target() else { return };
            if !contains(container, related) {
                if let Some(last) = last_focused.get() {
                    focus(last);
                }
            }
        },
    );

    let observer = observe_removals(container, move |removed: &[usize]| {
        if record.paused.get() || removed.is_empty() || active_element() != body() {
            return;
        }
        focus(container);
    });

    Box::new(move || {
        stop_focus_in();
        stop_focus_out();
        disconnect(observer);
    })
}

fn handle_key_down(event: &Event, record: &ScopeRecord, loop_: bool, trapped: bool) {
    if (!loop_ && !trapped) || record.paused.get() {
        return;
    }
    let Some(key) = event.key() else { return };
    if key.key != "Tab" || key.modifiers.intersects(Modifiers::ALT | Modifiers::CTRL | Modifiers::META) {
        return;
    }
    let Some(EventTarget::Node(container)) = event.current_target() else {
        return;
    };

    let focused = active_element();
    let tabbables = tabbable_nodes(container);
    match (tabbables.first().copied(), tabbables.last().copied()) {
        (Some(first), Some(last)) => {
            if !key.shift() && focused == last {
                event.prevent_default();
                if loop_ {
                    focus(first);
                }
            } else if key.shift() && focused == first {
                event.prevent_default();
                if loop_ {
                    focus(last);
                }
            }
        }
        _ => {
            if focused == container {
                event.prevent_default();
            }
        }
    }
}

// =============================================================================
// Component
// =============================================================================

/// Properties for [`focus_scope`].
#[derive(Default)]
pub struct FocusScopeProps {
    /// Tab on the last tabbable wraps to the first (and Shift+Tab back).
    pub loop_: bool,
    pub trapped: PropValue<bool>,
    /// Listener for [`AUTO_FOCUS_ON_MOUNT`].
    pub on_mount_auto_focus: Option<EventCallback>,
    /// Receives the [`AUTO_FOCUS_ON_UNMOUNT`] event.
    pub on_unmount_auto_focus: Option<EventCallback>,
    pub node_ref: Option<NodeRef>,
    pub render_as: RenderAs,
    pub children: Option<Children>,
}

/// Mount a focus scope around `children`.
pub fn focus_scope(props: FocusScopeProps) -> Cleanup {
    let FocusScopeProps {
        loop_,
        trapped,
        on_mount_auto_focus,
        on_unmount_auto_focus,
        node_ref,
        render_as,
        children,
    } = props;

    let node_ref = node_ref.unwrap_or_default();
    let record = Rc::new(ScopeRecord {
        paused: Cell::new(false),
    });

    let key_record = record.clone();
    let key_trapped = trapped.clone();
    let mut element = ElementProps::new("div")
        .node_ref(node_ref.clone())
        .tab_index(Some(-1))
        .on(EventKind::KeyDown, move |event: &Event| {
            handle_key_down(event, &key_record, loop_, key_trapped.get())
        });
    element.children = children;

    let rendered = render_as.render(element);
    let Some(container) = node_ref.peek() else {
        log::warn!("FocusScope rendered without attaching its node ref");
        return rendered;
    };
    if is_server() {
        return rendered;
    }

    // Trap listeners go in first so mount auto-focus records the last
    // focused node.
    let trap: Rc<RefCell<Option<Cleanup>>> = Rc::default();
    let trap_slot = trap.clone();
    let trap_record = record.clone();
    let last_focused: Rc<Cell<Option<usize>>> = Rc::default();
    let trap_scope = effect_scope(false);
    trap_scope.run(move || {
        let _stop = effect(move || {
            let on = trapped.get();
            untrack(|| {
                if let Some(cleanup) = trap_slot.borrow_mut().take() {
                    cleanup();
                }
                if on {
                    let cleanup = install_trap(container, trap_record.clone(), last_focused.clone());
                    *trap_slot.borrow_mut() = Some(cleanup);
                }
            });
        });
    });

    push_scope(&record);
    let previously_focused = active_element();
    if !contains(container, previously_focused) {
        let stop_listener = on_mount_auto_focus.map(|handler| {
            listen(container, EventKind::Custom(AUTO_FOCUS_ON_MOUNT), ListenerOptions::default(), move |event: &Event| {
                handler(event)
            })
        });
        let event = Event::new(EventKind::Custom(AUTO_FOCUS_ON_MOUNT), container)
            .with_bubbles(false)
            .with_cancelable(true);
        if dispatch_event(&event) {
            focus_first(&remove_links(tabbable_nodes(container)));
            if active_element() == previously_focused {
                focus(container);
            }
        }
        if let Some(stop) = stop_listener {
            stop();
        }
    }

    owned(Box::new(move || {
        trap_scope.stop();
        if let Some(cleanup) = trap.borrow_mut().take() {
            cleanup();
        }
        rendered();

        set_timeout(
            move || {
                let event = Event::new(EventKind::Custom(AUTO_FOCUS_ON_UNMOUNT), container)
                    .with_bubbles(false)
                    .with_cancelable(true);
                if let Some(handler) = &on_unmount_auto_focus {
                    handler(&event);
                }
                if !event.is_default_prevented() {
                    restore_focus(previously_focused);
                }
                remove_scope(&record);
            },
            0,
        );
    }))
}

// =============================================================================
// TESTS
// =============================================================================
