//! Focus Guards - a pair of tabbable sentinels at the edges of `body`.
//!
//! Tabbing off either end of a document lands on a guard instead of
//! leaving it, so scopes and layers can react. Guards are shared by every
//! caller and removed when the last one cleans up.

use std::cell::{Cell, RefCell};

use super::owner::owned;
use super::types::Cleanup;
use crate::engine::arrays::{attributes, interaction, style};
use crate::engine::{append_child, body, children_of, create_detached_node, insert_before, is_allocated, release_index};
use crate::state::environment::is_server;
use crate::types::PointerEvents;

/// Marker attribute set on both guards.
pub const FOCUS_GUARD_ATTRIBUTE: &str = "data-focus-guard";

thread_local! {
    static COUNT: Cell<usize> = const { Cell::new(0) };
    static GUARDS: RefCell<Option<(usize, usize)>> = const { RefCell::new(None) };
}

fn create_guard() -> usize {
    let guard = create_detached_node("span");
    attributes::set_attribute(guard, FOCUS_GUARD_ATTRIBUTE, "");
    interaction::set_tab_index(guard, Some(0));
    style::set_pointer_events(guard, Some(PointerEvents::None));
    style::set_opacity(guard, 0.0);
    guard
}

fn ensure_guards() -> (usize, usize) {
    let existing = GUARDS.with(|guards| *guards.borrow());
    let (start, end) = match existing {
        Some((start, end)) if is_allocated(start) && is_allocated(end) => (start, end),
        _ => (create_guard(), create_guard()),
    };

    let root = body();
    let first = children_of(root).into_iter().find(|&child| child != start);
    insert_before(root, start, first);
    append_child(root, end);

    GUARDS.with(|guards| *guards.borrow_mut() = Some((start, end)));
    (start, end)
}

fn remove_guards() {
    if let Some((start, end)) = GUARDS.with(|guards| guards.borrow_mut().take()) {
        log::debug!("removing focus guards");
        release_index(start);
        release_index(end);
    }
}

/// Make sure both guards sit at the edges of `body`.
///
/// The returned cleanup removes them once every caller has cleaned up.
pub fn use_focus_guards() -> Cleanup {
    if is_server() {
        return Box::new(|| {});
    }
    ensure_guards();
    COUNT.with(|count| count.set(count.get() + 1));

    owned(Box::new(|| {
        let remaining = COUNT.with(|count| count.get());
        if remaining == 1 {
            remove_guards();
        }
        COUNT.with(|count| count.set(remaining.saturating_sub(1)));
    }))
}

/// Number of live guard users.
pub fn focus_guard_count() -> usize {
    COUNT.with(|count| count.get())
}

/// The current `(start, end)` guards, if mounted.
pub fn focus_guards() -> Option<(usize, usize)> {
    GUARDS.with(|guards| *guards.borrow())
}

/// Forget all guards (for testing).
pub fn reset_focus_guards() {
    COUNT.with(|count| count.set(0));
    GUARDS.with(|guards| *guards.borrow_mut() = None);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::create_node;
    use crate::state::environment::set_environment;
    use crate::state::focus::{focus, focused_node};
    use crate::state::keyboard::{key_down, KeyboardEvent};
    use crate::types::Environment;

    fn setup() {
        crate::reset_all();
    }

    #[test]
    fn test_guards_wrap_body() {
        setup();

        let content = create_node("button", None);
        let cleanup = use_focus_guards();
        let (start, end) = focus_guards().unwrap();

        let children = children_of(body());
        assert_eq!(children.first(), Some(&start));
        assert_eq!(children.last(), Some(&end));
        assert!(children.contains(&content));
        assert!(attributes::has_attribute(start, FOCUS_GUARD_ATTRIBUTE));
        assert_eq!(style::get_pointer_events(end), Some(PointerEvents::None));

        cleanup();
        assert!(!is_allocated(start));
        assert!(!is_allocated(end));
        assert_eq!(focus_guards(), None);
    }

    #[test]
    fn test_guards_are_transparent_but_focusable() {
        setup();

        let content = create_node("button", None);
        let _cleanup = use_focus_guards();
        let (start, end) = focus_guards().unwrap();

        assert_eq!(style::get_opacity(start), 0.0);
        assert_eq!(style::get_opacity(end), 0.0);
        assert_eq!(style::get_opacity(content), 1.0);
        assert!(!style::get_visibility_hidden(start));
        assert!(focus(start));
        assert_eq!(focused_node(), Some(start));
    }

    #[test]
    fn test_guards_shared_until_last_cleanup() {
        setup();

        let first = use_focus_guards();
        let guards = focus_guards();
        let second = use_focus_guards();
        assert_eq!(focus_guards(), guards);
        assert_eq!(focus_guard_count(), 2);

        first();
        assert_eq!(focus_guards(), guards);
        assert_eq!(focus_guard_count(), 1);

        second();
        assert_eq!(focus_guards(), None);
        assert_eq!(focus_guard_count(), 0);
    }

    #[test]
    fn test_reuse_moves_guards_back_to_edges() {
        setup();

        let first = use_focus_guards();
        let late = create_node("div", None);
        let second = use_focus_guards();
        let (start, end) = focus_guards().unwrap();

        let children = children_of(body());
        assert_eq!(children, vec![start, late, end]);

        second();
        first();
    }

    #[test]
    fn test_tab_past_last_node_lands_on_guard() {
        setup();

        let button = create_node("button", None);
        let _cleanup = use_focus_guards();
        let (_, end) = focus_guards().unwrap();

        focus(button);
        key_down(KeyboardEvent::new("Tab"));
        assert_eq!(focused_node(), Some(end));
    }

    #[test]
    fn test_server_is_noop() {
        setup();
        set_environment(Environment::Server);

        let cleanup = use_focus_guards();
        assert_eq!(focus_guards(), None);
        assert_eq!(focus_guard_count(), 0);
        cleanup();
    }
}
