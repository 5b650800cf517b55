//! String attributes (`data-state`, `aria-*`, `class`, ...).

use std::cell::RefCell;
use std::collections::BTreeMap;

thread_local! {
    static ATTRIBUTES: RefCell<Vec<BTreeMap<String, String>>> = RefCell::new(Vec::new());
}

pub fn ensure_capacity(index: usize) {
    ATTRIBUTES.with(|arr| {
        let mut arr = arr.borrow_mut();
        if arr.len() <= index {
            arr.resize_with(index + 1, BTreeMap::new);
        }
    });
}

pub fn clear_at_index(index: usize) {
    ATTRIBUTES.with(|arr| {
        if let Some(slot) = arr.borrow_mut().get_mut(index) {
            slot.clear();
        }
    });
}

pub fn reset() {
    ATTRIBUTES.with(|arr| arr.borrow_mut().clear());
}

pub fn get_attribute(index: usize, name: &str) -> Option<String> {
    ATTRIBUTES.with(|arr| arr.borrow().get(index).and_then(|attrs| attrs.get(name).cloned()))
}

pub fn has_attribute(index: usize, name: &str) -> bool {
    ATTRIBUTES.with(|arr| {
        arr.borrow()
            .get(index)
            .is_some_and(|attrs| attrs.contains_key(name))
    })
}

pub fn set_attribute(index: usize, name: &str, value: &str) {
    ATTRIBUTES.with(|arr| {
        if let Some(attrs) = arr.borrow_mut().get_mut(index) {
            attrs.insert(name.to_string(), value.to_string());
        }
    });
}

pub fn remove_attribute(index: usize, name: &str) {
    ATTRIBUTES.with(|arr| {
        if let Some(attrs) = arr.borrow_mut().get_mut(index) {
            attrs.remove(name);
        }
    });
}

/// Set the attribute when `value` is `Some`, remove it otherwise.
pub fn set_optional_attribute(index: usize, name: &str, value: Option<&str>) {
    match value {
        Some(value) => set_attribute(index, name, value),
        None => remove_attribute(index, name),
    }
}

/// Snapshot of every attribute on the node.
pub fn get_attributes(index: usize) -> BTreeMap<String, String> {
    ATTRIBUTES.with(|arr| arr.borrow().get(index).cloned().unwrap_or_default())
}
