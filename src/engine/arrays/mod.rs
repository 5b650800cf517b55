//! Parallel arrays holding per-node document state.
//!
//! Each array index corresponds to one node. Arrays grow on allocation and
//! the slot is cleared on release; indices are never recycled, so a cleared
//! slot simply stays at its default.
//!
//! # Array Categories
//!
//! - **core**: tag, parent, ordered children, element id
//! - **interaction**: tab index, disabled
//! - **attributes**: string attributes (`data-*`, `aria-*`, `class`, ...)
//! - **style**: pointer-events, display, visibility, animation properties

pub mod attributes;
pub mod core;
pub mod interaction;
pub mod style;

use self::attributes as attribute_arrays;
use self::core as core_arrays;
use self::interaction as interaction_arrays;
use self::style as style_arrays;

/// Grow every array so `index` is addressable. Used by `allocate_index`.
pub fn ensure_all_capacity(index: usize) {
    core_arrays::ensure_capacity(index);
    interaction_arrays::ensure_capacity(index);
    attribute_arrays::ensure_capacity(index);
    style_arrays::ensure_capacity(index);
}

/// Return every slot at `index` to its default. Used by `release_index`.
pub fn clear_all_at_index(index: usize) {
    core_arrays::clear_at_index(index);
    interaction_arrays::clear_at_index(index);
    attribute_arrays::clear_at_index(index);
    style_arrays::clear_at_index(index);
}

/// Drop every array's contents.
pub fn reset_all_arrays() {
    core_arrays::reset();
    interaction_arrays::reset();
    attribute_arrays::reset();
    style_arrays::reset();
}
