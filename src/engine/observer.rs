//! Removal observers - subtree child-list mutations, removals only.
//!
//! `observe_removals(container, callback)` watches the container's whole
//! subtree. When a node is detached from a parent inside the container, a
//! record is queued; records are delivered in batches from a microtask,
//! after the mutation that produced them has finished.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::{contains, scheduler};

/// Called with the removed subtree roots, in removal order.
pub type RemovalCallback = Rc<dyn Fn(&[usize])>;

/// Handle used to disconnect an observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

struct Observer {
    id: usize,
    container: usize,
    callback: RemovalCallback,
    pending: Vec<usize>,
}

thread_local! {
    static OBSERVERS: RefCell<Vec<Observer>> = const { RefCell::new(Vec::new()) };
    static NEXT_ID: Cell<usize> = const { Cell::new(0) };
    static DELIVERY_QUEUED: Cell<bool> = const { Cell::new(false) };
}

/// Watch `container`'s subtree for removed nodes.
pub fn observe_removals(container: usize, callback: impl Fn(&[usize]) + 'static) -> ObserverId {
    let id = NEXT_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    });
    OBSERVERS.with(|observers| {
        observers.borrow_mut().push(Observer {
            id,
            container,
            callback: Rc::new(callback),
            pending: Vec::new(),
        });
    });
    ObserverId(id)
}

/// Stop observing. Pending records are dropped.
pub fn disconnect(id: ObserverId) {
    OBSERVERS.with(|observers| observers.borrow_mut().retain(|o| o.id != id.0));
}

/// Record that `node` is being detached from `parent`.
///
/// Called by the registry before the node is unlinked, while `parent` is
/// still reachable from the observed container.
pub(crate) fn record_removal(parent: usize, node: usize) {
    let queued_any = OBSERVERS.with(|observers| {
        let mut queued_any = false;
        for observer in observers.borrow_mut().iter_mut() {
            if contains(observer.container, parent) {
                observer.pending.push(node);
                queued_any = true;
            }
        }
        queued_any
    });
    if queued_any && !DELIVERY_QUEUED.with(|queued| queued.replace(true)) {
        scheduler::queue_microtask(deliver_records);
    }
}

fn deliver_records() {
    DELIVERY_QUEUED.with(|queued| queued.set(false));
    let batches: Vec<(usize, RemovalCallback, Vec<usize>)> = OBSERVERS.with(|observers| {
        observers
            .borrow_mut()
            .iter_mut()
            .filter(|o| !o.pending.is_empty())
            .map(|o| (o.id, o.callback.clone(), std::mem::take(&mut o.pending)))
            .collect()
    });
    for (id, callback, records) in batches {
        // An earlier callback may have disconnected this observer.
        let still_observing = OBSERVERS.with(|observers| observers.borrow().iter().any(|o| o.id == id));
        if still_observing {
            callback(&records);
        }
    }
}

/// Number of connected observers.
pub fn observer_count() -> usize {
    OBSERVERS.with(|observers| observers.borrow().len())
}

/// Reset all observers (for testing).
pub fn reset_observers() {
    OBSERVERS.with(|observers| observers.borrow_mut().clear());
    NEXT_ID.with(|next| next.set(0));
    DELIVERY_QUEUED.with(|queued| queued.set(false));
}
