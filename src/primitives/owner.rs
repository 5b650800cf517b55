//! Owner chain - who disposes a component, and which context frames it sees.
//!
//! Every mounted component runs inside an [`Owner`]. An owner:
//! - collects the cleanups of the components created under it
//! - optionally carries one context frame (channel + value)
//! - links to its parent, so context lookups walk outward
//!
//! Components wrap their cleanup with [`owned`]: the returned cleanup is
//! idempotent and is also registered with the current owner, so disposing
//! a parent disposes its children even when nobody kept their handles.
//!
//! ```ignore
//! let owner = Owner::child_of_current();
//! with_owner(&owner, || {
//!     let _ = element(ElementProps::new("div")); // registered with `owner`
//! });
//! owner.dispose(); // the div is released
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::types::Cleanup;

// =============================================================================
// Channels
// =============================================================================

/// Identity of a context channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(usize);

thread_local! {
    static NEXT_CONTEXT_ID: Cell<usize> = const { Cell::new(0) };
    static CURRENT: RefCell<Option<Owner>> = const { RefCell::new(None) };
}

impl ContextId {
    /// Allocate a fresh channel.
    pub fn next() -> Self {
        NEXT_CONTEXT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            ContextId(id)
        })
    }
}

// =============================================================================
// Owner
// =============================================================================

struct OwnerInner {
    parent: Option<Owner>,
    frame: Option<(ContextId, Rc<dyn Any>)>,
    cleanups: RefCell<Vec<Cleanup>>,
    disposed: Cell<bool>,
}

/// A node in the owner chain.
#[derive(Clone)]
pub struct Owner(Rc<OwnerInner>);

impl Owner {
    fn build(parent: Option<Owner>, frame: Option<(ContextId, Rc<dyn Any>)>) -> Self {
        Owner(Rc::new(OwnerInner {
            parent,
            frame,
            cleanups: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        }))
    }

    /// A root owner with no parent.
    pub fn root() -> Self {
        Self::build(None, None)
    }

    /// A child of `parent` (or a root when `None`).
    pub fn child(parent: Option<&Owner>) -> Self {
        Self::build(parent.cloned(), None)
    }

    /// A child of the current owner.
    pub fn child_of_current() -> Self {
        Self::build(current_owner(), None)
    }

    /// A child of `parent` carrying one context frame.
    pub fn with_frame(parent: Option<&Owner>, id: ContextId, value: Rc<dyn Any>) -> Self {
        Self::build(parent.cloned(), Some((id, value)))
    }

    /// Nearest value provided on `id`, walking from this owner outward.
    pub fn lookup(&self, id: ContextId) -> Option<Rc<dyn Any>> {
        let mut current = Some(self);
        while let Some(owner) = current {
            if let Some((frame_id, value)) = &owner.0.frame {
                if *frame_id == id {
                    return Some(value.clone());
                }
            }
            current = owner.0.parent.as_ref();
        }
        None
    }

    /// Register a cleanup. Runs immediately if this owner is already disposed.
    pub fn add_cleanup(&self, cleanup: Cleanup) {
        if self.0.disposed.get() {
            cleanup();
            return;
        }
        self.0.cleanups.borrow_mut().push(cleanup);
    }

    /// Run every registered cleanup, newest first.
    pub fn dispose(&self) {
        if self.0.disposed.replace(true) {
            return;
        }
        let cleanups = std::mem::take(&mut *self.0.cleanups.borrow_mut());
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.get()
    }
}

// =============================================================================
// Current Owner
// =============================================================================

/// The owner components are currently being created under.
pub fn current_owner() -> Option<Owner> {
    CURRENT.with(|current| current.borrow().clone())
}

/// Run `f` with `owner` as the current owner.
pub fn with_owner<R>(owner: &Owner, f: impl FnOnce() -> R) -> R {
    let previous = CURRENT.with(|current| current.replace(Some(owner.clone())));
    let result = f();
    CURRENT.with(|current| *current.borrow_mut() = previous);
    result
}

/// Run `f` with the current owner temporarily cleared.
pub fn without_owner<R>(f: impl FnOnce() -> R) -> R {
    let previous = CURRENT.with(|current| current.replace(None));
    let result = f();
    CURRENT.with(|current| *current.borrow_mut() = previous);
    result
}

/// Register a cleanup with the current owner.
///
/// Without an owner the cleanup only runs if the caller runs it.
pub fn on_cleanup(cleanup: impl FnOnce() + 'static) {
    match current_owner() {
        Some(owner) => owner.add_cleanup(Box::new(cleanup)),
        None => log::trace!("on_cleanup called without an owner"),
    }
}

/// Make a component cleanup idempotent and register it with the current owner.
pub fn owned(cleanup: Cleanup) -> Cleanup {
    let slot: Rc<RefCell<Option<Cleanup>>> = Rc::new(RefCell::new(Some(cleanup)));
    let slot_for_owner = slot.clone();
    on_cleanup(move || {
        let cleanup = slot_for_owner.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    });
    Box::new(move || {
        let cleanup = slot.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    })
}

/// Nearest value provided on `id` from the current owner.
pub fn lookup_context(id: ContextId) -> Option<Rc<dyn Any>> {
    current_owner().and_then(|owner| owner.lookup(id))
}

/// Reset the current owner (for testing).
pub fn reset_owner() {
    CURRENT.with(|current| *current.borrow_mut() = None);
}

// =============================================================================
// TESTS
// =============================================================================
