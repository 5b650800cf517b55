//! Interaction arrays: tab index and disabled state.
//!
//! These decide whether a node can take focus and where it sits in the
//! sequential (Tab) navigation order.

use std::cell::RefCell;

thread_local! {
    /// Explicit tab index (None = attribute absent).
    static TAB_INDEX: RefCell<Vec<Option<i32>>> = RefCell::new(Vec::new());

    /// Is the node disabled.
    static DISABLED: RefCell<Vec<bool>> = RefCell::new(Vec::new());
}

// =============================================================================
// Capacity Management
// =============================================================================

pub fn ensure_capacity(index: usize) {
    TAB_INDEX.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, None);
        }
    });
    DISABLED.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, false);
        }
    });
}

pub fn clear_at_index(index: usize) {
    TAB_INDEX.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = None;
        }
    });
    DISABLED.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = false;
        }
    });
}

pub fn reset() {
    TAB_INDEX.with(|arr| arr.borrow_mut().clear());
    DISABLED.with(|arr| arr.borrow_mut().clear());
}

// =============================================================================
// Tab Index
// =============================================================================

/// Explicit tab index at index.
pub fn get_tab_index(index: usize) -> Option<i32> {
    TAB_INDEX.with(|arr| arr.borrow().get(index).copied().flatten())
}

/// Set (or remove with `None`) the tab index at index.
pub fn set_tab_index(index: usize, tab_index: Option<i32>) {
    TAB_INDEX.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = tab_index;
        }
    });
}

// =============================================================================
// Disabled
// =============================================================================

pub fn get_disabled(index: usize) -> bool {
    DISABLED.with(|arr| arr.borrow().get(index).copied().unwrap_or(false))
}

pub fn set_disabled(index: usize, disabled: bool) {
    DISABLED.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = disabled;
        }
    });
}
