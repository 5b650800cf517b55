//! Slot - rendering a primitive's behavior onto a caller-supplied element.
//!
//! A primitive builds an [`ElementProps`] carrying its ARIA attributes,
//! listeners and refs. With [`RenderAs::Element`] those props render the
//! default element. With [`RenderAs::Child`] they are handed to the caller,
//! who merges them into their own element with [`merge_props`].
//!
//! ```ignore
//! roving_focus_group_item(RovingFocusGroupItemProps {
//!     render_as: RenderAs::child(|props| {
//!         element(merge_props(props, ElementProps::new("button").attr("class", "toggle")))
//!     }),
//!     ..Default::default()
//! })
//! ```

use std::rc::Rc;

use super::element::{element, ElementProps, StyleProps};
use super::types::{Cleanup, EventCallback, PropValue};
use crate::engine::events::Event;

// =============================================================================
// Render Strategy
// =============================================================================

/// How a primitive renders its element.
#[derive(Default)]
pub enum RenderAs {
    /// Render the primitive's own default element.
    #[default]
    Element,
    /// Hand the primitive's props to a caller render function.
    Child(Box<dyn FnOnce(ElementProps) -> Cleanup>),
}

impl RenderAs {
    pub fn child(render: impl FnOnce(ElementProps) -> Cleanup + 'static) -> Self {
        RenderAs::Child(Box::new(render))
    }

    /// Render `props` with this strategy.
    pub fn render(self, props: ElementProps) -> Cleanup {
        match self {
            RenderAs::Element => element(props),
            RenderAs::Child(render) => render(props),
        }
    }
}

// =============================================================================
// Prop Merging
// =============================================================================

fn join_classes(slot: Option<String>, child: Option<String>) -> Option<String> {
    match (slot, child) {
        (Some(a), Some(b)) => Some(format!("{a} {b}")),
        (a, b) => a.or(b),
    }
}

/// Merge a primitive's props (`slot`) into a caller's props (`child`).
///
/// - listeners: child first, then slot
/// - attributes: child wins, except `class` which is space-joined
/// - style: child wins per field
/// - `disabled`: OR-combined
/// - refs: both
/// - tag, id, tab index, children: child wins when set
pub fn merge_props(slot: ElementProps, child: ElementProps) -> ElementProps {
    let ElementProps {
        tag: slot_tag,
        id: slot_id,
        attributes: slot_attributes,
        tab_index: slot_tab_index,
        disabled: slot_disabled,
        style: slot_style,
        listeners: slot_listeners,
        refs: slot_refs,
        children: slot_children,
    } = slot;

    let mut attributes = slot_attributes;
    for (name, value) in child.attributes {
        let existing = attributes.iter().position(|(n, _)| *n == name);
        match existing {
            Some(position) if name == "class" => {
                let (_, slot_value) = attributes.remove(position);
                let merged = if slot_value.is_static() && value.is_static() {
                    PropValue::Static(join_classes(slot_value.get(), value.get()))
                } else {
                    PropValue::getter(move || join_classes(slot_value.get(), value.get()))
                };
                attributes.push((name, merged));
            }
            Some(position) => {
                attributes[position] = (name, value);
            }
            None => attributes.push((name, value)),
        }
    }

    let disabled = match (slot_disabled, child.disabled) {
        (Some(a), Some(b)) => Some(PropValue::getter(move || a.get() || b.get())),
        (a, b) => a.or(b),
    };

    let style = StyleProps {
        pointer_events: child.style.pointer_events.or(slot_style.pointer_events),
        display_none: child.style.display_none.or(slot_style.display_none),
        visibility_hidden: child.style.visibility_hidden.or(slot_style.visibility_hidden),
        animation_name: child.style.animation_name.or(slot_style.animation_name),
    };

    let mut listeners = child.listeners;
    listeners.extend(slot_listeners);

    let mut refs = slot_refs;
    refs.extend(child.refs);

    ElementProps {
        tag: child.tag.or(slot_tag),
        id: child.id.or(slot_id),
        attributes,
        tab_index: child.tab_index.or(slot_tab_index),
        disabled,
        style,
        listeners,
        refs,
        children: child.children.or(slot_children),
    }
}

// =============================================================================
// Handler Composition
// =============================================================================

/// Chain a user handler in front of an internal one.
///
/// `ours` is skipped when `original` called `prevent_default`.
pub fn compose_event_handlers(
    original: Option<EventCallback>,
    ours: impl Fn(&Event) + 'static,
) -> EventCallback {
    Rc::new(move |event: &Event| {
        if let Some(original) = &original {
            original(event);
        }
        if !event.is_default_prevented() {
            ours(event);
        }
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::arrays::{attributes, interaction};
    use crate::engine::events::EventKind;
    use crate::primitives::NodeRef;
    use crate::state::pointer::click;
    use std::cell::RefCell;

    fn setup() {
        crate::reset_all();
    }

    #[test]
    fn test_merge_attributes_and_class() {
        setup();

        let slot = ElementProps::new("div")
            .attr("data-state", "open")
            .attr("class", "primitive")
            .attr("role", "group");
        let child = ElementProps::new("section")
            .attr("data-state", "custom")
            .attr("class", "mine");

        let node_ref = NodeRef::new();
        let _cleanup = element(merge_props(slot, child.node_ref(node_ref.clone())));
        let node = node_ref.peek().unwrap();

        assert_eq!(crate::engine::arrays::core::get_tag(node), "section");
        assert_eq!(attributes::get_attribute(node, "data-state").as_deref(), Some("custom"));
        assert_eq!(attributes::get_attribute(node, "class").as_deref(), Some("primitive mine"));
        assert_eq!(attributes::get_attribute(node, "role").as_deref(), Some("group"));
    }

    #[test]
    fn test_merge_listeners_child_first_and_refs_both() {
        setup();

        let log = Rc::new(RefCell::new(Vec::new()));
        let slot_log = log.clone();
        let child_log = log.clone();
        let slot_ref = NodeRef::new();
        let child_ref = NodeRef::new();

        let slot = ElementProps::new("button")
            .node_ref(slot_ref.clone())
            .on(EventKind::Click, move |_| slot_log.borrow_mut().push("slot"));
        let child = ElementProps::default()
            .node_ref(child_ref.clone())
            .on(EventKind::Click, move |_| child_log.borrow_mut().push("child"));

        let _cleanup = element(merge_props(slot, child));
        let node = slot_ref.peek().unwrap();
        assert_eq!(child_ref.peek(), Some(node));

        click(node);
        assert_eq!(*log.borrow(), vec!["child", "slot"]);
    }

    #[test]
    fn test_disabled_is_or_combined() {
        setup();

        let node_ref = NodeRef::new();
        let slot = ElementProps::new("button").disabled_with(|| false);
        let child = ElementProps::default()
            .disabled_with(|| true)
            .node_ref(node_ref.clone());

        let _cleanup = element(merge_props(slot, child));
        assert!(interaction::get_disabled(node_ref.peek().unwrap()));
    }

    #[test]
    fn test_render_as_child_receives_props() {
        setup();

        let node_ref = NodeRef::new();
        let node_ref_inner = node_ref.clone();
        let _cleanup = RenderAs::child(move |props| {
            element(merge_props(props, ElementProps::new("a").node_ref(node_ref_inner)))
        })
        .render(ElementProps::new("button").attr("aria-pressed", "true"));

        let node = node_ref.peek().unwrap();
        assert_eq!(crate::engine::arrays::core::get_tag(node), "a");
        assert_eq!(attributes::get_attribute(node, "aria-pressed").as_deref(), Some("true"));
    }

    #[test]
    fn test_compose_event_handlers_respects_prevent_default() {
        setup();

        let node = crate::engine::create_node("div", None);
        let ran = Rc::new(RefCell::new(0));
        let ran_clone = ran.clone();
        let handler = compose_event_handlers(
            Some(Rc::new(|event: &Event| event.prevent_default())),
            move |_| *ran_clone.borrow_mut() += 1,
        );

        let event = Event::new(EventKind::Custom("test"), node).with_cancelable(true);
        handler(&event);
        assert_eq!(*ran.borrow(), 0);

        let plain = compose_event_handlers(None, {
            let ran = ran.clone();
            move |_| *ran.borrow_mut() += 1
        });
        let fresh = Event::new(EventKind::Custom("test"), node);
        plain(&fresh);
        assert_eq!(*ran.borrow(), 1);
    }
}
