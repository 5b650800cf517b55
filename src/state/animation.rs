//! Animation Module - computed animation state and animation event drivers
//!
//! There is no compositor: the host (or a test) reports when an animation
//! starts, ends or is cancelled on a node. What *would* be animating is
//! read from the style arrays:
//!
//! - inline `animation-name` wins
//! - otherwise the first stylesheet rule whose `[attribute="value"]`
//!   selector matches the node
//! - otherwise `"none"`
//!
//! # Example
//!
//! ```ignore
//! use spark_primitives::engine::arrays::style;
//! use spark_primitives::state::animation;
//!
//! style::add_animation_rule("data-state", "closed", "fade-out");
//! // ... node gets data-state="closed" ...
//! assert_eq!(animation::computed_animation_name(node), "fade-out");
//! animation::animation_end(node, "fade-out");
//! ```

use crate::engine::arrays::{attributes, style};
use crate::engine::events::{dispatch_event, Event, EventDetail, EventKind};
use crate::engine::scheduler;

/// The `animation-name` value meaning "no animation".
pub const NO_ANIMATION: &str = "none";

/// Resolved `animation-name` of a node.
pub fn computed_animation_name(index: usize) -> String {
    if let Some(name) = style::get_animation_name(index) {
        return name;
    }
    style::animation_rules()
        .into_iter()
        .find(|rule| attributes::get_attribute(index, &rule.attribute).as_deref() == Some(rule.value.as_str()))
        .map(|rule| rule.animation)
        .unwrap_or_else(|| NO_ANIMATION.to_string())
}

/// `display: none` on the node itself.
pub fn is_display_none(index: usize) -> bool {
    style::get_display_none(index)
}

fn dispatch_animation(kind: EventKind, index: usize, name: &str) {
    let event = Event::new(kind, index).with_detail(EventDetail::Animation(name.to_string()));
    dispatch_event(&event);
    scheduler::run_microtasks();
}

/// Report that the node's current animation started.
pub fn animation_start(index: usize) {
    let name = computed_animation_name(index);
    dispatch_animation(EventKind::AnimationStart, index, &name);
}

/// Report that the animation `name` finished on the node.
pub fn animation_end(index: usize, name: &str) {
    dispatch_animation(EventKind::AnimationEnd, index, name);
}

/// Report that the animation `name` was cancelled on the node.
pub fn animation_cancel(index: usize, name: &str) {
    dispatch_animation(EventKind::AnimationCancel, index, name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::create_node;
    use crate::engine::events::{add_event_listener, ListenerOptions};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn setup() {
        crate::reset_all();
    }

    #[test]
    fn test_computed_animation_name() {
        setup();

        let node = create_node("div", None);
        assert_eq!(computed_animation_name(node), "none");

        style::add_animation_rule("data-state", "closed", "fade-out");
        attributes::set_attribute(node, "data-state", "open");
        assert_eq!(computed_animation_name(node), "none");
        attributes::set_attribute(node, "data-state", "closed");
        assert_eq!(computed_animation_name(node), "fade-out");

        style::set_animation_name(node, Some("slide"));
        assert_eq!(computed_animation_name(node), "slide");
    }

    #[test]
    fn test_animation_events_carry_name() {
        setup();

        let node = create_node("div", None);
        style::set_animation_name(node, Some("fade-in"));
        let seen = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::AnimationStart, EventKind::AnimationEnd] {
            let seen = seen.clone();
            add_event_listener(node, kind, ListenerOptions::default(), move |event: &Event| {
                seen.borrow_mut()
                    .push((event.kind(), event.animation_name().map(str::to_string)));
            });
        }

        animation_start(node);
        animation_end(node, "fade-in");
        assert_eq!(
            *seen.borrow(),
            vec![
                (EventKind::AnimationStart, Some("fade-in".to_string())),
                (EventKind::AnimationEnd, Some("fade-in".to_string())),
            ]
        );
    }
}
