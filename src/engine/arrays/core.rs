//! Core arrays: tag, parent, ordered children, element id.
//!
//! Child lists are kept in render order; document order queries walk them.

use std::cell::RefCell;

thread_local! {
    /// Element tag (`div`, `button`, `span`, ...).
    static TAG: RefCell<Vec<String>> = RefCell::new(Vec::new());

    /// Parent node index (None for detached nodes and the document element).
    static PARENT_INDEX: RefCell<Vec<Option<usize>>> = RefCell::new(Vec::new());

    /// Children in document order.
    static CHILDREN: RefCell<Vec<Vec<usize>>> = RefCell::new(Vec::new());

    /// Element id attribute.
    static ELEMENT_ID: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

// =============================================================================
// Capacity Management
// =============================================================================

pub fn ensure_capacity(index: usize) {
    TAG.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, String::new());
        }
    });
    PARENT_INDEX.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, None);
        }
    });
    CHILDREN.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize_with(index + 1, Vec::new);
        }
    });
    ELEMENT_ID.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize(index + 1, String::new());
        }
    });
}

pub fn clear_at_index(index: usize) {
    TAG.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            slot.clear();
        }
    });
    PARENT_INDEX.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = None;
        }
    });
    CHILDREN.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            slot.clear();
        }
    });
    ELEMENT_ID.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            slot.clear();
        }
    });
}

pub fn reset() {
    TAG.with(|arr| arr.borrow_mut().clear());
    PARENT_INDEX.with(|arr| arr.borrow_mut().clear());
    CHILDREN.with(|arr| arr.borrow_mut().clear());
    ELEMENT_ID.with(|arr| arr.borrow_mut().clear());
}

// =============================================================================
// Tag
// =============================================================================

pub fn get_tag(index: usize) -> String {
    TAG.with(|arr| arr.borrow().get(index).cloned().unwrap_or_default())
}

pub fn set_tag(index: usize, tag: &str) {
    TAG.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = tag.to_ascii_lowercase();
        }
    });
}

// =============================================================================
// Element Id
// =============================================================================

pub fn get_element_id(index: usize) -> String {
    ELEMENT_ID.with(|arr| arr.borrow().get(index).cloned().unwrap_or_default())
}

pub fn set_element_id(index: usize, id: &str) {
    ELEMENT_ID.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            *slot = id.to_string();
        }
    });
}

// =============================================================================
// Tree Links
// =============================================================================

pub fn get_parent_index(index: usize) -> Option<usize> {
    PARENT_INDEX.with(|arr| arr.borrow().get(index).copied().flatten())
}

pub fn get_children(index: usize) -> Vec<usize> {
    CHILDREN.with(|arr| arr.borrow().get(index).cloned().unwrap_or_default())
}

/// Position of `child` among its parent's children.
pub fn child_position(parent: usize, child: usize) -> Option<usize> {
    CHILDREN.with(|arr| {
        arr.borrow()
            .get(parent)
            .and_then(|children| children.iter().position(|&c| c == child))
    })
}

/// Link `child` under `parent`, before `reference` when it is one of the
/// parent's children, otherwise at the end.
///
/// A child already linked elsewhere is unlinked first.
pub fn insert_child(parent: usize, child: usize, reference: Option<usize>) {
    detach(child);
    CHILDREN.with(|arr| {
        let mut arr = arr.borrow_mut();
        if let Some(children) = arr.get_mut(parent) {
            let at = reference
                .and_then(|r| children.iter().position(|&c| c == r))
                .unwrap_or(children.len());
            children.insert(at, child);
        }
    });
    PARENT_INDEX.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(child) {
            *slot = Some(parent);
        }
    });
}

/// Unlink `child` from its parent, if any.
pub fn detach(child: usize) {
    let Some(parent) = get_parent_index(child) else {
        return;
    };
    CHILDREN.with(|arr| {
        if let Some(children) = arr.borrow_mut().get_mut(parent) {
            children.retain(|&c| c != child);
        }
    });
    PARENT_INDEX.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(child) {
            *slot = None;
        }
    });
}
