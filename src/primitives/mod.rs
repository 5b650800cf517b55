//! Interaction primitives - headless building blocks for widgets.
//!
//! Foundations:
//! - [`owner`] - cleanup ownership and context frames
//! - [`element`] - create a node and bind reactive props to it
//! - [`control_flow`] - conditional rendering with [`show`]
//! - [`slot`] - render-as-child prop merging
//!
//! State and structure:
//! - [`controllable`] - controlled/uncontrolled values
//! - [`context`] - named and scoped contexts
//! - [`collection`] - document-ordered item registry
//!
//! Behavior:
//! - [`presence`] - mount/unmount with exit animations
//! - [`dismissable_layer`] - escape and outside-interaction dismissal
//! - [`roving_focus`] - arrow-key navigation with a single tab stop
//! - [`focus_scope`] - auto-focus, trapping, looping
//! - [`focus_guards`] - tabbable sentinels at the edges of `body`
//!
//! # Reactivity
//!
//! Props can be:
//! - Static values: `PropValue::Static(true)`
//! - Signals: `PropValue::Signal(open)` (stays connected!)
//! - Getters: `PropValue::getter(move || open.get())`
//!
//! Pass props directly - don't extract values before binding!
//!
//! ```ignore
//! // CORRECT - signal stays connected
//! focus_scope(FocusScopeProps { trapped: PropValue::Signal(trapped), ..Default::default() });
//!
//! // WRONG - extracts value, breaks reactivity
//! focus_scope(FocusScopeProps { trapped: PropValue::Static(trapped.get()), ..Default::default() });
//! ```

mod types;

pub mod collection;
pub mod context;
pub mod control_flow;
pub mod controllable;
pub mod dismissable_layer;
pub mod element;
pub mod focus_guards;
pub mod focus_scope;
pub mod owner;
pub mod presence;
pub mod roving_focus;
pub mod slot;

pub use types::*;

pub use collection::{create_collection, Collection, CollectionItem, ItemsGetter};
pub use context::{
    compose_context_scopes, create_context, create_scoped_context_factory, Context, CreateScope, Scope,
    ScopedContext, ScopedContextFactory, UseScope,
};
pub use control_flow::show;
pub use controllable::{
    create_controllable_array_signal, create_controllable_boolean_signal, create_controllable_signal,
    ControllableProps, ControllableSignal,
};
pub use dismissable_layer::{
    dismissable_layer, dismissable_layer_branch, DismissableLayerBranchProps, DismissableLayerProps,
};
pub use element::{element, ElementProps, StyleProps};
pub use focus_guards::use_focus_guards;
pub use focus_scope::{focus_scope, FocusScopeProps};
pub use owner::{on_cleanup, owned, Owner};
pub use presence::{create_presence, presence, use_presence, PresenceHandle, PresenceProps};
pub use roving_focus::{
    create_roving_focus_group_scope, roving_focus_group, roving_focus_group_item, ItemData,
    RovingFocusGroupItemProps, RovingFocusGroupProps,
};
pub use slot::{compose_event_handlers, merge_props, RenderAs};
