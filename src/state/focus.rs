//! Focus System - focused node, focus events and sequential navigation
//!
//! Manages focus state and navigation:
//! - `FOCUSED` signal (currently focused node, `None` = body)
//! - Focus changes with `blur`/`focusout`/`focus`/`focusin` events
//! - Focusable / tabbable queries
//! - Sequential navigation (the default action of Tab / Shift+Tab)
//!
//! # Example
//!
//! ```ignore
//! use spark_primitives::state::focus;
//!
//! // Focus a specific node
//! focus::focus(button);
//!
//! // Who has focus? (body when nothing does)
//! let active = focus::active_element();
//!
//! // Tab forward
//! focus::focus_next_tabbable(false);
//! ```

use std::cell::Cell;
use std::cmp::Ordering;

use spark_signals::{signal, untrack, Signal};

use crate::engine::arrays::{core, interaction, style};
use crate::engine::events::{dispatch_event, Event, EventKind};
use crate::engine::{
    body, compare_document_position, contains, descendants, document_element, is_allocated,
    is_connected, parent_of,
};

/// Tags that take focus without an explicit tab index.
const NATIVELY_FOCUSABLE: &[&str] = &["button", "input", "select", "textarea"];

// =============================================================================
// FOCUSED NODE SIGNAL
// =============================================================================

thread_local! {
    static FOCUSED: Signal<Option<usize>> = signal(None);

    /// Bumped on every focus change, so a focus call can tell whether a
    /// blur handler moved focus somewhere else in the meantime.
    static FOCUS_GENERATION: Cell<u64> = const { Cell::new(0) };
}

/// Get the focused node (None when focus is on body). Tracked.
pub fn focused_node() -> Option<usize> {
    FOCUSED.with(|s| s.get())
}

/// The document's active element: the focused node, else `body`. Untracked.
pub fn active_element() -> usize {
    untrack(focused_node).unwrap_or_else(body)
}

/// Check if a specific node is focused. Tracked.
pub fn is_focused(index: usize) -> bool {
    focused_node() == Some(index)
}

fn set_focused(value: Option<usize>) {
    FOCUS_GENERATION.with(|generation| generation.set(generation.get() + 1));
    FOCUSED.with(|s| s.set(value));
}

fn generation() -> u64 {
    FOCUS_GENERATION.with(Cell::get)
}

// =============================================================================
// FOCUSABLE QUERIES
// =============================================================================

/// Hidden by `display: none` or `visibility: hidden` on itself or an ancestor.
pub fn is_hidden(index: usize) -> bool {
    let mut current = Some(index);
    while let Some(node) = current {
        if style::get_display_none(node) || style::get_visibility_hidden(node) {
            return true;
        }
        current = parent_of(node);
    }
    false
}

/// Tab index a node effectively has (`None` = not focusable by tag or attribute).
pub fn effective_tab_index(index: usize) -> Option<i32> {
    if let Some(tab_index) = interaction::get_tab_index(index) {
        return Some(tab_index);
    }
    let tag = core::get_tag(index);
    let native = NATIVELY_FOCUSABLE.contains(&tag.as_str())
        || (tag == "a" && crate::engine::arrays::attributes::has_attribute(index, "href"));
    native.then_some(0)
}

/// Can the node receive focus at all (programmatically or by pointer).
pub fn is_focusable(index: usize) -> bool {
    is_allocated(index)
        && is_connected(index)
        && !interaction::get_disabled(index)
        && !is_hidden(index)
        && effective_tab_index(index).is_some()
}

/// Is the node reachable with Tab.
pub fn is_tabbable(index: usize) -> bool {
    is_focusable(index) && effective_tab_index(index).is_some_and(|t| t >= 0)
}

/// Tabbable descendants of `container` in document order.
pub fn tabbable_nodes(container: usize) -> Vec<usize> {
    descendants(container)
        .into_iter()
        .filter(|&node| is_tabbable(node))
        .collect()
}

// =============================================================================
// FOCUS CHANGES
// =============================================================================

/// Focus a node.
///
/// Fires `blur` then `focusout` (related = new) on the previously focused
/// node, then `focus` then `focusin` (related = old) on the new one.
/// Returns whether the node holds focus afterwards. Focusing the focused
/// node is a no-op that returns true.
pub fn focus(index: usize) -> bool {
    if !is_focusable(index) {
        return false;
    }
    let old = untrack(focused_node);
    if old == Some(index) {
        return true;
    }

    if let Some(old) = old {
        set_focused(None);
        let before_blur = generation();
        dispatch_event(&Event::new(EventKind::Blur, old).with_related_target(Some(index)));
        dispatch_event(&Event::new(EventKind::FocusOut, old).with_related_target(Some(index)));
        // A blur handler moved focus; that move wins.
        if generation() != before_blur {
            return untrack(focused_node) == Some(index);
        }
        if !is_focusable(index) {
            return false;
        }
    }

    set_focused(Some(index));
    dispatch_event(&Event::new(EventKind::Focus, index).with_related_target(old));
    dispatch_event(&Event::new(EventKind::FocusIn, index).with_related_target(old));
    untrack(focused_node) == Some(index)
}

/// Move focus to body, firing `blur` and `focusout` on the old node.
pub fn blur() {
    let Some(old) = untrack(focused_node) else {
        return;
    };
    set_focused(None);
    dispatch_event(&Event::new(EventKind::Blur, old));
    dispatch_event(&Event::new(EventKind::FocusOut, old));
}

/// Focus reverts to body without events when the focused node leaves the
/// document inside a released subtree.
pub(crate) fn handle_subtree_removed(root: usize) {
    if let Some(focused) = untrack(focused_node) {
        if contains(root, focused) {
            set_focused(None);
        }
    }
}

// =============================================================================
// SEQUENTIAL NAVIGATION
// =============================================================================

/// The default action of Tab (`backwards` = Shift+Tab).
///
/// Moves to the next tabbable node in document order after (or before)
/// the focused node. At either end of the document focus leaves to body.
/// Returns whether a node received focus.
pub fn focus_next_tabbable(backwards: bool) -> bool {
    let candidates = tabbable_nodes(document_element());
    let current = untrack(focused_node);

    let next = match current {
        None if backwards => candidates.last().copied(),
        None => candidates.first().copied(),
        Some(current) if backwards => candidates
            .iter()
            .rev()
            .find(|&&c| compare_document_position(c, current) == Ordering::Less)
            .copied(),
        Some(current) => candidates
            .iter()
            .find(|&&c| compare_document_position(c, current) == Ordering::Greater)
            .copied(),
    };

    match next {
        Some(node) => focus(node),
        None => {
            blur();
            false
        }
    }
}

// =============================================================================
// RESET (for testing)
// =============================================================================

/// Reset all focus state (for testing). Fires no events.
pub fn reset_focus_state() {
    FOCUSED.with(|s| s.set(None));
    FOCUS_GENERATION.with(|generation| generation.set(0));
}

// =============================================================================
// TESTS
// =============================================================================
