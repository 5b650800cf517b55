//! Control Flow Primitives - Conditional rendering.
//!
//! # Pattern: EffectScope-based Cleanup
//!
//! `show` uses spark-signals' EffectScope for cleanup:
//! 1. Create an EffectScope to manage the lifetime of the condition effect
//! 2. Run the effect inside `scope.run()`
//! 3. Register branch cleanup with `on_scope_dispose()`
//! 4. Return a cleanup that stops the scope
//!
//! # Pattern: Context Restoration
//!
//! Branches can render long after `show()` was called (whenever the
//! condition flips). `show()` captures the parent index and the current
//! owner at creation time and restores both before rendering a branch, so
//! a branch lands in the right place in the tree and still sees the
//! context frames its creator saw.
//!
//! Branches render untracked: signals read while rendering a branch never
//! become dependencies of the condition.
//!
//! ```ignore
//! element(ElementProps::new("div").children(move || {
//!     // show() called here - captures parent = this div
//!     show(
//!         move || open.get(),
//!         || element(ElementProps::new("section")),
//!         None::<fn() -> Cleanup>,
//!     );
//! }));
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{effect, effect_scope, on_scope_dispose, untrack};

use super::owner::{owned, with_owner, Owner};
use crate::engine::{get_current_parent_index, with_parent};
use crate::primitives::Cleanup;

/// Conditionally render components based on a reactive condition.
///
/// Creates and destroys components when the condition changes. The condition
/// getter establishes a reactive dependency, so the tree updates on its own.
///
/// # Arguments
///
/// * `condition` - Getter that returns boolean (creates reactive dependency)
/// * `then_fn` - Function to render when condition is true (returns cleanup)
/// * `else_fn` - Optional function to render when condition is false
///
/// # Returns
///
/// A cleanup function that destroys the current branch and stops tracking.
pub fn show<ThenF, ElseF, ThenR, ElseR>(
    condition: impl Fn() -> bool + 'static,
    then_fn: ThenF,
    else_fn: Option<ElseF>,
) -> Cleanup
where
    ThenF: Fn() -> ThenR + 'static,
    ElseF: Fn() -> ElseR + 'static,
    ThenR: Into<Cleanup>,
    ElseR: Into<Cleanup>,
{
    // Capture creation context - branches render later
    let parent_index = get_current_parent_index();
    let owner = Owner::child_of_current();

    // Storage for current branch and condition state
    let branch: Rc<RefCell<Option<(Owner, Cleanup)>>> = Rc::new(RefCell::new(None));
    let was_true: Rc<Cell<Option<bool>>> = Rc::new(Cell::new(None));

    let scope = effect_scope(false);

    let branch_for_update = branch.clone();
    let branch_for_dispose = branch.clone();

    let dispose_branch = |slot: &RefCell<Option<(Owner, Cleanup)>>| {
        let previous = slot.borrow_mut().take();
        if let Some((branch_owner, cleanup)) = previous {
            cleanup();
            branch_owner.dispose();
        }
    };

    // Update function - runs when condition changes
    let update = move |new_condition: bool| {
        if was_true.get() == Some(new_condition) {
            return;
        }
        was_true.set(Some(new_condition));

        dispose_branch(&branch_for_update);

        let branch_owner = Owner::child(Some(&owner));
        let render = || -> Option<Cleanup> {
            if new_condition {
                Some(then_fn().into())
            } else {
                else_fn.as_ref().map(|f| f().into())
            }
        };
        let new_cleanup = untrack(|| {
            with_owner(&branch_owner, || match parent_index {
                Some(parent) => with_parent(parent, render),
                None => render(),
            })
        });

        if let Some(cleanup) = new_cleanup {
            *branch_for_update.borrow_mut() = Some((branch_owner, cleanup));
        }
    };

    scope.run(move || {
        // Initial render happens on the first effect run
        let _effect_cleanup = effect(move || {
            let current = condition();
            update(current);
        });

        on_scope_dispose(move || dispose_branch(&branch_for_dispose));
    });

    owned(Box::new(move || {
        scope.stop();
        dispose_branch(&branch);
    }))
}

// =============================================================================
// TESTS
// =============================================================================
