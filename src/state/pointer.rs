//! Pointer Module - `pointerdown` / `mousedown` / `click` host drivers
//!
//! The host reports a press on a node; this module resolves the hit target,
//! dispatches the events a browser would, and applies the default focus
//! behavior of a mouse press.
//!
//! # Hit resolution
//!
//! `pointer-events` is inherited. A node whose effective value is `none`
//! is transparent to the pointer, so the press lands on the document
//! element instead.

use super::focus;
use crate::engine::arrays::style;
use crate::engine::events::{dispatch_event, Event, EventDetail, EventKind};
use crate::engine::{document_element, parent_of, scheduler};
use crate::types::{PointerEvents, PointerType};

/// Effective `pointer-events` of a node (inline value on the nearest
/// inclusive ancestor, `auto` when none is set).
pub fn effective_pointer_events(index: usize) -> PointerEvents {
    let mut current = Some(index);
    while let Some(node) = current {
        if let Some(value) = style::get_pointer_events(node) {
            return value;
        }
        current = parent_of(node);
    }
    PointerEvents::Auto
}

/// Node that actually receives a press aimed at `target`.
pub fn hit_target(target: usize) -> usize {
    match effective_pointer_events(target) {
        PointerEvents::Auto => target,
        PointerEvents::None => document_element(),
    }
}

/// Nearest inclusive ancestor that can take focus.
fn focusable_ancestor(index: usize) -> Option<usize> {
    let mut current = Some(index);
    while let Some(node) = current {
        if focus::is_focusable(node) {
            return Some(node);
        }
        current = parent_of(node);
    }
    None
}

/// Press a pointer on `target`.
///
/// Dispatches `PointerDown`, then for mouse pointers `MouseDown`. Unless the
/// mouse-down was prevented, focus moves to the nearest focusable inclusive
/// ancestor of the hit node, or to body. Returns false when the
/// pointer-down was prevented.
pub fn pointer_down(target: usize, pointer_type: PointerType) -> bool {
    let hit = hit_target(target);
    let pointer_event = Event::new(EventKind::PointerDown, hit).with_detail(EventDetail::Pointer(pointer_type));
    let not_prevented = dispatch_event(&pointer_event);

    let focus_default = match pointer_type {
        PointerType::Mouse => {
            let mouse_event = Event::new(EventKind::MouseDown, hit).with_detail(EventDetail::Pointer(pointer_type));
            dispatch_event(&mouse_event)
        }
        PointerType::Touch | PointerType::Pen => true,
    };

    if focus_default {
        match focusable_ancestor(hit) {
            Some(node) => {
                focus::focus(node);
            }
            None => focus::blur(),
        }
    }

    scheduler::run_microtasks();
    not_prevented
}

/// Dispatch a `Click` at `target` (after hit resolution).
pub fn click(target: usize) -> bool {
    let hit = hit_target(target);
    let not_prevented = dispatch_event(&Event::new(EventKind::Click, hit));
    scheduler::run_microtasks();
    not_prevented
}

/// A full press: `pointer_down` followed by `click`.
pub fn press(target: usize, pointer_type: PointerType) {
    pointer_down(target, pointer_type);
    click(target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::arrays::interaction;
    use crate::engine::events::{add_event_listener, EventTarget, ListenerOptions};
    use crate::engine::{body, create_node, with_parent};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn setup() {
        crate::reset_all();
    }

    #[test]
    fn test_press_focuses_focusable_ancestor() {
        setup();

        let button = create_node("button", None);
        let label = with_parent(button, || create_node("span", None));

        pointer_down(label, PointerType::Mouse);
        assert_eq!(focus::focused_node(), Some(button));

        let plain = create_node("div", None);
        pointer_down(plain, PointerType::Mouse);
        assert_eq!(focus::focused_node(), None);
    }

    #[test]
    fn test_prevented_mousedown_keeps_focus() {
        setup();

        let a = create_node("button", None);
        let b = create_node("button", None);
        interaction::set_tab_index(b, Some(-1));
        add_event_listener(b, EventKind::MouseDown, ListenerOptions::default(), |event: &Event| {
            event.prevent_default();
        });

        focus::focus(a);
        pointer_down(b, PointerType::Mouse);
        assert_eq!(focus::focused_node(), Some(a));
    }

    #[test]
    fn test_pointer_events_none_falls_through_to_document() {
        setup();

        style::set_pointer_events(body(), Some(PointerEvents::None));
        let layer = create_node("div", None);
        style::set_pointer_events(layer, Some(PointerEvents::Auto));
        let outside = create_node("button", None);

        assert_eq!(hit_target(layer), layer);
        assert_eq!(hit_target(outside), document_element());

        let targets = Rc::new(RefCell::new(Vec::new()));
        let targets_clone = targets.clone();
        add_event_listener(EventTarget::Document, EventKind::PointerDown, ListenerOptions::default(), move |event: &Event| {
            targets_clone.borrow_mut().push(event.target_node());
        });
        pointer_down(outside, PointerType::Mouse);
        assert_eq!(*targets.borrow(), vec![Some(document_element())]);
    }

    #[test]
    fn test_touch_skips_mousedown() {
        setup();

        let node = create_node("div", None);
        let mouse_downs = Rc::new(Cell::new(0));
        let mouse_downs_clone = mouse_downs.clone();
        add_event_listener(node, EventKind::MouseDown, ListenerOptions::default(), move |_| {
            mouse_downs_clone.set(mouse_downs_clone.get() + 1);
        });

        pointer_down(node, PointerType::Touch);
        assert_eq!(mouse_downs.get(), 0);
        pointer_down(node, PointerType::Mouse);
        assert_eq!(mouse_downs.get(), 1);
    }
}
