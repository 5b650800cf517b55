//! Widgets - composites assembled from the primitives.
//!
//! - [`collapsible`] - trigger + content region, content through Presence
//! - [`toggle_group`] - pressed-state buttons on a roving focus group
//! - [`progress`] - validated bounded value with a progressbar role

pub mod collapsible;
pub mod progress;
pub mod toggle_group;

pub use collapsible::{
    collapsible, collapsible_content, collapsible_trigger, create_collapsible_scope, CollapsibleContentProps,
    CollapsibleProps, CollapsibleTriggerProps,
};
pub use progress::{
    create_progress_scope, progress, progress_indicator, ProgressIndicatorProps, ProgressProps, ProgressState,
};
pub use toggle_group::{
    create_toggle_group_scope, toggle_group, toggle_group_item, ToggleGroupItemProps, ToggleGroupKind,
    ToggleGroupProps,
};
