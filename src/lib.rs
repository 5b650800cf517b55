//! # spark-primitives
//!
//! Headless interaction primitives for fine-grained reactive UIs.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for fine-grained reactivity.
//!
//! ## Architecture
//!
//! Nodes are indices into parallel arrays, the same ECS-style layout the
//! spark-tui renderer uses. On top of that headless document sit the
//! behaviors accessible widgets share:
//!
//! ```text
//! engine (registry, arrays, events, scheduler)
//!   → state (focus, keyboard, pointer, animation, crossterm input)
//!     → primitives (controllable, context, collection, presence,
//!                   dismissable layer, roving focus, focus scope/guards)
//!       → widgets (collapsible, toggle group, progress)
//! ```
//!
//! Every component is a function taking a props struct and returning a
//! [`Cleanup`]. Deferred work (microtasks, zero-delay timers, removal
//! records) runs on a virtual clock that tests drive explicitly.
//!
//! ## Modules
//!
//! - [`types`] - Shared enums (Orientation, Direction, PresenceStatus, etc.)
//! - [`error`] - `PrimitiveError` and the `Result` alias
//! - [`engine`] - Node registry, parallel arrays, event dispatch, scheduler
//! - [`state`] - Focus, keyboard, pointer and animation drivers
//! - [`primitives`] - The interaction kernel
//! - [`widgets`] - Composites built on the kernel

pub mod engine;
pub mod error;
pub mod primitives;
pub mod state;
pub mod types;
pub mod widgets;

// Re-export commonly used items
pub use types::*;

pub use error::{PrimitiveError, Result};

pub use engine::{
    append_child, body, contains, create_node, document_element, get_element_by_id, insert_before,
    is_allocated, release_index, with_parent,
};

pub use engine::events::{listen, Event, EventKind, EventTarget, ListenerOptions};

pub use engine::scheduler::{flush, run_due_timers, run_microtasks};

pub use primitives::{
    // Plumbing
    element, show, merge_props, compose_event_handlers, on_cleanup,
    Cleanup, ElementProps, NodeRef, PropValue, RenderAs,
    // Kernel
    create_controllable_signal, ControllableProps, ControllableSignal,
    create_scoped_context_factory, compose_context_scopes, Scope, CreateScope,
    create_collection, Collection,
    presence, create_presence, use_presence, PresenceHandle, PresenceProps,
    dismissable_layer, dismissable_layer_branch, DismissableLayerProps, DismissableLayerBranchProps,
    roving_focus_group, roving_focus_group_item, RovingFocusGroupProps, RovingFocusGroupItemProps,
    focus_scope, FocusScopeProps,
    use_focus_guards,
};

pub use state::{
    // Focus
    focus, blur, active_element, focused_node,
    // Keyboard
    key_down, KeyboardEvent, Modifiers,
    // Pointer
    click, pointer_down,
    // Environment
    is_server, set_environment,
};

pub use widgets::{
    collapsible, collapsible_content, collapsible_trigger, progress, progress_indicator, toggle_group,
    toggle_group_item, ToggleGroupKind,
};

/// Reset every thread-local registry (for testing).
///
/// Clears pending tasks first so nothing deferred runs against the fresh
/// document.
pub fn reset_all() {
    engine::scheduler::reset_scheduler();
    engine::observer::reset_observers();
    engine::events::reset_events();
    state::focus::reset_focus_state();
    state::keyboard::reset_keyboard_state();
    state::input::reset_input_state();
    state::environment::reset_environment();
    primitives::dismissable_layer::reset_layer_stack();
    primitives::focus_scope::reset_focus_scope_stack();
    primitives::focus_guards::reset_focus_guards();
    primitives::owner::reset_owner();
    engine::reset_registry();
}
