//! End-to-end behavior across primitives, driven through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_primitives::engine::arrays::{attributes, style};
use spark_primitives::primitives::context::Scope;
use spark_primitives::state::animation::animation_end;
use spark_primitives::widgets::collapsible::{CollapsibleProps, CollapsibleTriggerProps, create_collapsible_scope};
use spark_primitives::{
    Cleanup, DismissableLayerProps, ElementProps, Event, KeyboardEvent, NodeRef, Orientation, PresenceHandle,
    PresenceProps, RovingFocusGroupItemProps, RovingFocusGroupProps, click, collapsible, collapsible_trigger,
    dismissable_layer, element, focus, focused_node, is_allocated, key_down, on_cleanup, presence,
    roving_focus_group, roving_focus_group_item, run_microtasks,
};
use spark_signals::signal;

fn setup() {
    spark_primitives::reset_all();
}

fn state(node: usize) -> Option<String> {
    attributes::get_attribute(node, "data-state")
}

// =============================================================================
// Nested compound instances
// =============================================================================

#[test]
fn nested_collapsibles_keep_separate_state() {
    setup();

    let outer_ref = NodeRef::new();
    let inner_ref = NodeRef::new();
    let inner_trigger_ref = NodeRef::new();
    let inner_ref_inner = inner_ref.clone();
    let inner_trigger_ref_inner = inner_trigger_ref.clone();

    let _cleanup = collapsible(CollapsibleProps {
        node_ref: Some(outer_ref.clone()),
        children: Some(Box::new(move || {
            on_cleanup(collapsible(CollapsibleProps {
                node_ref: Some(inner_ref_inner),
                children: Some(Box::new(move || {
                    on_cleanup(
                        collapsible_trigger(CollapsibleTriggerProps {
                            node_ref: Some(inner_trigger_ref_inner),
                            ..Default::default()
                        })
                        .unwrap(),
                    );
                })),
                ..Default::default()
            }));
        })),
        ..Default::default()
    });
    let outer = outer_ref.peek().unwrap();
    let inner = inner_ref.peek().unwrap();

    click(inner_trigger_ref.peek().unwrap());
    assert_eq!(state(inner).as_deref(), Some("open"));
    assert_eq!(state(outer).as_deref(), Some("closed"));
}

#[test]
fn scoped_trigger_reaches_past_nearer_instance() {
    setup();

    let outer_scope = create_collapsible_scope().create().scope(&Scope::default());
    let inner_scope = create_collapsible_scope().create().scope(&Scope::default());
    let outer_ref = NodeRef::new();
    let inner_ref = NodeRef::new();
    let trigger_ref = NodeRef::new();
    let inner_ref_inner = inner_ref.clone();
    let trigger_ref_inner = trigger_ref.clone();
    let trigger_scope = outer_scope.clone();

    let _cleanup = collapsible(CollapsibleProps {
        scope: outer_scope,
        node_ref: Some(outer_ref.clone()),
        children: Some(Box::new(move || {
            on_cleanup(collapsible(CollapsibleProps {
                scope: inner_scope,
                node_ref: Some(inner_ref_inner),
                children: Some(Box::new(move || {
                    // Rendered inside the inner instance, bound to the outer one.
                    on_cleanup(
                        collapsible_trigger(CollapsibleTriggerProps {
                            scope: trigger_scope,
                            node_ref: Some(trigger_ref_inner),
                            ..Default::default()
                        })
                        .unwrap(),
                    );
                })),
                ..Default::default()
            }));
        })),
        ..Default::default()
    });

    click(trigger_ref.peek().unwrap());
    assert_eq!(state(outer_ref.peek().unwrap()).as_deref(), Some("open"));
    assert_eq!(state(inner_ref.peek().unwrap()).as_deref(), Some("closed"));
}

// =============================================================================
// Roving focus without looping
// =============================================================================

#[test]
fn arrow_right_stops_at_last_item() {
    setup();

    let refs: Vec<NodeRef> = (0..3).map(|_| NodeRef::new()).collect();
    let item_refs = refs.clone();
    let _cleanup = roving_focus_group(RovingFocusGroupProps {
        orientation: Some(Orientation::Horizontal),
        loop_: false,
        children: Some(Box::new(move || {
            for (node_ref, id) in item_refs.into_iter().zip(["A", "B", "C"]) {
                on_cleanup(
                    roving_focus_group_item(RovingFocusGroupItemProps {
                        tab_stop_id: Some(id.to_string()),
                        node_ref: Some(node_ref),
                        ..Default::default()
                    })
                    .unwrap(),
                );
            }
        })),
        ..Default::default()
    });
    let [a, _b, c] = [0, 1, 2].map(|i| refs[i].peek().unwrap());

    focus(a);
    key_down(KeyboardEvent::new("ArrowRight"));
    key_down(KeyboardEvent::new("ArrowRight"));
    assert_eq!(focused_node(), Some(c));

    key_down(KeyboardEvent::new("ArrowRight"));
    assert_eq!(focused_node(), Some(c));
}

// =============================================================================
// Presence exit animation
// =============================================================================

#[test]
fn presence_waits_for_matching_animation_end() {
    setup();

    style::add_animation_rule("data-state", "closed", "fade-out");
    let present = signal(true);
    let present_read = present.clone();
    let present_attr = present.clone();
    let content_ref = NodeRef::new();
    let content_ref_inner = content_ref.clone();

    let _cleanup = presence(PresenceProps {
        present: Rc::new(move || present_read.get()),
        children: Rc::new(move |handle: &PresenceHandle| -> Cleanup {
            let present_attr = present_attr.clone();
            let rendered = element(
                ElementProps::new("div")
                    .node_ref(content_ref_inner.clone())
                    .attr_with("data-state", move || {
                        Some(if present_attr.get() { "open" } else { "closed" }.to_string())
                    }),
            );
            handle.register_node(content_ref_inner.peek());
            rendered
        }),
        ..Default::default()
    });
    let content = content_ref.peek().unwrap();

    present.set(false);
    run_microtasks();
    assert!(is_allocated(content));
    assert_eq!(state(content).as_deref(), Some("closed"));

    animation_end(content, "slide-out");
    assert!(is_allocated(content));

    animation_end(content, "fade-out");
    assert!(!is_allocated(content));
}

// =============================================================================
// Stacked layers
// =============================================================================

#[test]
fn escape_reaches_only_the_top_layer() {
    setup();

    let first_escapes = Rc::new(Cell::new(0));
    let second_escapes = Rc::new(Cell::new(0));
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();

    let first_count = first_escapes.clone();
    let first_log = log.clone();
    let _first = dismissable_layer(DismissableLayerProps {
        on_escape_key_down: Some(Rc::new(move |_: &Event| first_count.set(first_count.get() + 1))),
        on_dismiss: Some(Rc::new(move || first_log.borrow_mut().push("first"))),
        ..Default::default()
    });

    let second_count = second_escapes.clone();
    let second_log = log.clone();
    let second = dismissable_layer(DismissableLayerProps {
        on_escape_key_down: Some(Rc::new(move |_: &Event| second_count.set(second_count.get() + 1))),
        on_dismiss: Some(Rc::new(move || second_log.borrow_mut().push("second"))),
        ..Default::default()
    });

    key_down(KeyboardEvent::new("Escape"));
    assert_eq!((first_escapes.get(), second_escapes.get()), (0, 1));

    second();
    key_down(KeyboardEvent::new("Escape"));
    assert_eq!((first_escapes.get(), second_escapes.get()), (1, 1));
    assert_eq!(*log.borrow(), vec!["second", "first"]);
}
