//! Node Registry - Index allocation, tree structure and document order.
//!
//! Manages the lifecycle of node indices:
//! - Monotonic index allocation (released indices are never handed out again)
//! - Element id lookup
//! - ReactiveSet for allocated indices (deriveds react to add/remove)
//! - Parent context stack for nested node creation
//! - Lazily created document element (`html`) and `body`
//! - Document-order comparison for ordered queries

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::HashMap;

use spark_signals::{untrack, ReactiveSet};

use super::arrays;
use super::arrays::core;
use super::{events, observer};
use crate::state::focus;

// =============================================================================
// Registry State
// =============================================================================

thread_local! {
    /// Map element id to node index (latest node wins on duplicates).
    static ID_TO_INDEX: RefCell<HashMap<String, usize>> = RefCell::new(HashMap::new());

    /// Set of currently allocated indices (for iteration).
    /// Using ReactiveSet so deriveds that iterate over this set
    /// automatically react when nodes are added or removed.
    static ALLOCATED_INDICES: RefCell<ReactiveSet<usize>> = RefCell::new(ReactiveSet::new());

    /// Next index to allocate.
    static NEXT_INDEX: Cell<usize> = const { Cell::new(0) };

    /// Counter for generated ids.
    static ID_COUNTER: Cell<usize> = const { Cell::new(0) };

    /// Stack of parent indices for nested node creation.
    static PARENT_STACK: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };

    /// Destroy callbacks registered per index.
    static DESTROY_CALLBACKS: RefCell<HashMap<usize, Vec<Box<dyn FnOnce()>>>> = RefCell::new(HashMap::new());

    /// The `html` element, created on first use.
    static DOCUMENT_ELEMENT: Cell<Option<usize>> = const { Cell::new(None) };

    /// The `body` element, created on first use.
    static BODY: Cell<Option<usize>> = const { Cell::new(None) };
}

// =============================================================================
// Parent Context Stack
// =============================================================================

/// Get current parent index (None when creating at the top level).
pub fn get_current_parent_index() -> Option<usize> {
    PARENT_STACK.with(|stack| stack.borrow().last().copied())
}

/// Push a parent index onto the stack.
pub fn push_parent_context(index: usize) {
    PARENT_STACK.with(|stack| stack.borrow_mut().push(index));
}

/// Pop a parent index from the stack.
pub fn pop_parent_context() {
    PARENT_STACK.with(|stack| {
        stack.borrow_mut().pop();
    });
}

/// Run `f` with `index` as the current parent.
pub fn with_parent<R>(index: usize, f: impl FnOnce() -> R) -> R {
    push_parent_context(index);
    let result = f();
    pop_parent_context();
    result
}

// =============================================================================
// Index Allocation
// =============================================================================

/// Allocate a fresh index with capacity in every parallel array.
pub fn allocate_index() -> usize {
    let index = NEXT_INDEX.with(|next| {
        let index = next.get();
        next.set(index + 1);
        index
    });
    ALLOCATED_INDICES.with(|set| {
        set.borrow_mut().insert(index);
    });
    arrays::ensure_all_capacity(index);
    index
}

/// Create an element and append it under the current parent context,
/// or under `body` when there is none.
pub fn create_node(tag: &str, id: Option<&str>) -> usize {
    let parent = get_current_parent_index().unwrap_or_else(body);
    let index = allocate_index();
    core::set_tag(index, tag);
    if let Some(id) = id {
        set_element_id(index, id);
    }
    core::insert_child(parent, index, None);
    index
}

/// Create an element that is not attached to the document.
pub fn create_detached_node(tag: &str) -> usize {
    let index = allocate_index();
    core::set_tag(index, tag);
    index
}

/// Insert `node` under `parent` before `reference` (append when `None`).
pub fn insert_before(parent: usize, node: usize, reference: Option<usize>) {
    if !is_allocated(parent) || !is_allocated(node) || contains(node, parent) {
        return;
    }
    core::insert_child(parent, node, reference);
}

/// Append `node` as the last child of `parent`.
pub fn append_child(parent: usize, node: usize) {
    insert_before(parent, node, None);
}

/// Release a node and its whole subtree.
///
/// Children are released first. For every node in the subtree: destroy
/// callbacks run, listeners are dropped and array slots are cleared.
/// Removal observers receive one record for the subtree root, and focus
/// falls back to `body` if it was inside the subtree.
pub fn release_index(index: usize) {
    if !is_allocated(index) {
        return;
    }

    let parent = core::get_parent_index(index);
    if let Some(parent) = parent {
        observer::record_removal(parent, index);
    }
    focus::handle_subtree_removed(index);
    core::detach(index);

    if DOCUMENT_ELEMENT.with(Cell::get) == Some(index) {
        DOCUMENT_ELEMENT.with(|cell| cell.set(None));
    }
    if BODY.with(Cell::get) == Some(index) {
        BODY.with(|cell| cell.set(None));
    }

    release_subtree(index);
}

fn release_subtree(index: usize) {
    for child in core::get_children(index) {
        release_subtree(child);
    }

    run_destroy_callbacks(index);
    events::remove_listeners_for(index);

    let id = core::get_element_id(index);
    if !id.is_empty() {
        ID_TO_INDEX.with(|map| {
            let mut map = map.borrow_mut();
            if map.get(&id) == Some(&index) {
                map.remove(&id);
            }
        });
    }
    ALLOCATED_INDICES.with(|set| {
        set.borrow_mut().remove(&index);
    });
    arrays::clear_all_at_index(index);
}

// =============================================================================
// Destroy Callbacks
// =============================================================================

/// Register a callback to run when the node at `index` is released.
pub fn on_destroy(index: usize, callback: impl FnOnce() + 'static) {
    DESTROY_CALLBACKS.with(|callbacks| {
        callbacks
            .borrow_mut()
            .entry(index)
            .or_default()
            .push(Box::new(callback));
    });
}

/// Run and clear destroy callbacks for an index.
fn run_destroy_callbacks(index: usize) {
    let callbacks = DESTROY_CALLBACKS.with(|callbacks| callbacks.borrow_mut().remove(&index));
    if let Some(callbacks) = callbacks {
        for callback in callbacks {
            callback();
        }
    }
}

// =============================================================================
// Document
// =============================================================================

/// The root `html` element.
pub fn document_element() -> usize {
    if let Some(index) = DOCUMENT_ELEMENT.with(Cell::get) {
        return index;
    }
    let index = create_detached_node("html");
    DOCUMENT_ELEMENT.with(|cell| cell.set(Some(index)));
    index
}

/// The `body` element.
pub fn body() -> usize {
    if let Some(index) = BODY.with(Cell::get) {
        return index;
    }
    let html = document_element();
    let index = create_detached_node("body");
    core::insert_child(html, index, None);
    BODY.with(|cell| cell.set(Some(index)));
    index
}

// =============================================================================
// Element Ids
// =============================================================================

/// Set the element id attribute and index it for lookup.
pub fn set_element_id(index: usize, id: &str) {
    core::set_element_id(index, id);
    ID_TO_INDEX.with(|map| {
        map.borrow_mut().insert(id.to_string(), index);
    });
}

/// Look up a mounted node by element id.
pub fn get_element_by_id(id: &str) -> Option<usize> {
    ID_TO_INDEX.with(|map| map.borrow().get(id).copied())
}

/// Generate a document-unique id (`{prefix}-{n}`).
pub fn generate_id(prefix: &str) -> String {
    let n = ID_COUNTER.with(|counter| {
        let n = counter.get() + 1;
        counter.set(n);
        n
    });
    format!("{prefix}-{n}")
}

// =============================================================================
// Tree Queries
// =============================================================================

pub fn parent_of(index: usize) -> Option<usize> {
    core::get_parent_index(index)
}

pub fn children_of(index: usize) -> Vec<usize> {
    core::get_children(index)
}

/// All descendants in document (pre-)order, excluding `index` itself.
pub fn descendants(index: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut stack: Vec<usize> = core::get_children(index).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(core::get_children(node).into_iter().rev());
    }
    out
}

/// Inclusive containment: a node contains itself.
pub fn contains(ancestor: usize, node: usize) -> bool {
    let mut current = Some(node);
    while let Some(index) = current {
        if index == ancestor {
            return true;
        }
        current = core::get_parent_index(index);
    }
    false
}

/// Is the node attached under the document element.
pub fn is_connected(index: usize) -> bool {
    is_allocated(index) && DOCUMENT_ELEMENT.with(Cell::get).is_some_and(|html| contains(html, index))
}

/// Path from the tree root down to `index` (inclusive).
fn path_from_root(index: usize) -> Vec<usize> {
    let mut path = vec![index];
    let mut current = index;
    while let Some(parent) = core::get_parent_index(current) {
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}

/// Compare two nodes by document (pre-)order.
///
/// An ancestor precedes its descendants. Nodes in different trees are
/// ordered tree by tree: the document first, then detached trees by root
/// index. This keeps the order total for sorting.
pub fn compare_document_position(a: usize, b: usize) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let path_a = path_from_root(a);
    let path_b = path_from_root(b);
    if path_a[0] != path_b[0] {
        let html = DOCUMENT_ELEMENT.with(Cell::get);
        let detached = |root: usize| Some(root) != html;
        return detached(path_a[0])
            .cmp(&detached(path_b[0]))
            .then(path_a[0].cmp(&path_b[0]));
    }

    let shared = path_a.iter().zip(&path_b).take_while(|(x, y)| x == y).count();
    match (path_a.get(shared), path_b.get(shared)) {
        (None, _) => Ordering::Less,
        (_, None) => Ordering::Greater,
        (Some(&branch_a), Some(&branch_b)) => {
            let parent = path_a[shared - 1];
            let pos_a = core::child_position(parent, branch_a);
            let pos_b = core::child_position(parent, branch_b);
            pos_a.cmp(&pos_b)
        }
    }
}

// =============================================================================
// Lookups
// =============================================================================

/// Get all currently allocated indices.
///
/// Note: This creates a reactive dependency when called from a derived/effect.
pub fn get_allocated_indices() -> Vec<usize> {
    ALLOCATED_INDICES.with(|set| set.borrow().iter().copied().collect())
}

/// Check if an index is currently allocated. Never tracked.
pub fn is_allocated(index: usize) -> bool {
    untrack(|| ALLOCATED_INDICES.with(|set| set.borrow().contains(&index)))
}

/// Get the count of currently allocated nodes.
pub fn get_allocated_count() -> usize {
    untrack(|| ALLOCATED_INDICES.with(|set| set.borrow().len()))
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Reset all registry state (for testing).
pub fn reset_registry() {
    ID_TO_INDEX.with(|map| map.borrow_mut().clear());
    ALLOCATED_INDICES.with(|set| set.borrow_mut().clear());
    NEXT_INDEX.with(|next| next.set(0));
    ID_COUNTER.with(|counter| counter.set(0));
    PARENT_STACK.with(|stack| stack.borrow_mut().clear());
    DESTROY_CALLBACKS.with(|callbacks| callbacks.borrow_mut().clear());
    DOCUMENT_ELEMENT.with(|cell| cell.set(None));
    BODY.with(|cell| cell.set(None));
    arrays::reset_all_arrays();
}
