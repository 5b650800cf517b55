//! Style arrays: the handful of CSS properties the primitives read or write.
//!
//! Inline values live per node. Animation names can also come from a
//! small stylesheet of attribute-selector rules, resolved by
//! `state::animation::computed_animation_name`.

use std::cell::RefCell;

use crate::types::PointerEvents;

/// `[attribute="value"] { animation-name: animation }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationRule {
    pub attribute: String,
    pub value: String,
    pub animation: String,
}

thread_local! {
    /// Inline `pointer-events` (None = not set, inherits).
    static POINTER_EVENTS: RefCell<Vec<Option<PointerEvents>>> = RefCell::new(Vec::new());

    /// Inline `display: none`.
    static DISPLAY_NONE: RefCell<Vec<bool>> = RefCell::new(Vec::new());

    /// Inline `visibility: hidden`.
    static VISIBILITY_HIDDEN: RefCell<Vec<bool>> = RefCell::new(Vec::new());

    /// Inline `opacity` (1.0 when unset).
    static OPACITY: RefCell<Vec<f32>> = RefCell::new(Vec::new());

    /// Inline `animation-name`.
    static ANIMATION_NAME: RefCell<Vec<Option<String>>> = RefCell::new(Vec::new());

    /// Inline `animation-fill-mode`.
    static ANIMATION_FILL_MODE: RefCell<Vec<Option<String>>> = RefCell::new(Vec::new());

    /// Stylesheet rules, first match wins.
    static ANIMATION_RULES: RefCell<Vec<AnimationRule>> = const { RefCell::new(Vec::new()) };
}

// =============================================================================
// Capacity Management
// =============================================================================

pub fn ensure_capacity(index: usize) {
    POINTER_EVENTS.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, None);
        }
    });
    DISPLAY_NONE.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, false);
        }
    });
    VISIBILITY_HIDDEN.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, false);
        }
    });
    OPACITY.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, 1.0);
        }
    });
    ANIMATION_NAME.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, None);
        }
    });
    ANIMATION_FILL_MODE.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, None);
        }
    });
}

pub fn clear_at_index(index: usize) {
    POINTER_EVENTS.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = None;
        }
    });
    DISPLAY_NONE.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = false;
        }
    });
    VISIBILITY_HIDDEN.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = false;
        }
    });
    OPACITY.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = 1.0;
        }
    });
    ANIMATION_NAME.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = None;
        }
    });
    ANIMATION_FILL_MODE.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = None;
        }
    });
}

pub fn reset() {
    POINTER_EVENTS.with(|arr| arr.borrow_mut().clear());
    DISPLAY_NONE.with(|arr| arr.borrow_mut().clear());
    VISIBILITY_HIDDEN.with(|arr| arr.borrow_mut().clear());
    OPACITY.with(|arr| arr.borrow_mut().clear());
    ANIMATION_NAME.with(|arr| arr.borrow_mut().clear());
    ANIMATION_FILL_MODE.with(|arr| arr.borrow_mut().clear());
    ANIMATION_RULES.with(|rules| rules.borrow_mut().clear());
}

// =============================================================================
// Pointer Events
// =============================================================================

pub fn get_pointer_events(index: usize) -> Option<PointerEvents> {
    POINTER_EVENTS.with(|arr| arr.borrow().get(index).copied().flatten())
}

pub fn set_pointer_events(index: usize, value: Option<PointerEvents>) {
    POINTER_EVENTS.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = value;
        }
    });
}

// =============================================================================
// Display / Visibility
// =============================================================================

pub fn get_display_none(index: usize) -> bool {
    DISPLAY_NONE.with(|arr| arr.borrow().get(index).copied().unwrap_or(false))
}

pub fn set_display_none(index: usize, hidden: bool) {
    DISPLAY_NONE.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = hidden;
        }
    });
}

pub fn get_visibility_hidden(index: usize) -> bool {
    VISIBILITY_HIDDEN.with(|arr| arr.borrow().get(index).copied().unwrap_or(false))
}

pub fn set_visibility_hidden(index: usize, hidden: bool) {
    VISIBILITY_HIDDEN.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = hidden;
        }
    });
}

pub fn get_opacity(index: usize) -> f32 {
    OPACITY.with(|arr| arr.borrow().get(index).copied().unwrap_or(1.0))
}

pub fn set_opacity(index: usize, opacity: f32) {
    OPACITY.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = opacity.clamp(0.0, 1.0);
        }
    });
}

// =============================================================================
// Animation
// =============================================================================

pub fn get_animation_name(index: usize) -> Option<String> {
    ANIMATION_NAME.with(|arr| arr.borrow().get(index).cloned().flatten())
}

pub fn set_animation_name(index: usize, name: Option<&str>) {
    ANIMATION_NAME.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = name.map(str::to_string);
        }
    });
}

pub fn get_animation_fill_mode(index: usize) -> Option<String> {
    ANIMATION_FILL_MODE.with(|arr| arr.borrow().get(index).cloned().flatten())
}

pub fn set_animation_fill_mode(index: usize, mode: Option<&str>) {
    ANIMATION_FILL_MODE.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = mode.map(str::to_string);
        }
    });
}

/// Register a stylesheet rule `[attribute="value"] { animation-name: animation }`.
pub fn add_animation_rule(attribute: &str, value: &str, animation: &str) {
    ANIMATION_RULES.with(|rules| {
        rules.borrow_mut().push(AnimationRule {
            attribute: attribute.to_string(),
            value: value.to_string(),
            animation: animation.to_string(),
        });
    });
}

pub fn animation_rules() -> Vec<AnimationRule> {
    ANIMATION_RULES.with(|rules| rules.borrow().clone())
}
