//! Toggle Group - a set of two-state buttons with roving focus.
//!
//! `kind` is required:
//! - [`ToggleGroupKind::Single`] holds at most one pressed value; items are
//!   radios (`role="radio"`, `aria-checked`)
//! - [`ToggleGroupKind::Multiple`] holds any subset; items carry
//!   `aria-pressed`
//!
//! The group composes the roving focus scope into its own, so a toggle
//! group nested in another roving group keeps its own tab stop.

use std::rc::Rc;

use crate::engine::events::{Event, EventKind};
use crate::error::{PrimitiveError, Result};
use crate::primitives::context::{create_scoped_context_factory, CreateScope, Scope, ScopedContext, UseScope};
use crate::primitives::roving_focus::{create_roving_focus_group_scope, roving_focus_group, roving_focus_group_item};
use crate::primitives::{
    compose_event_handlers, create_controllable_array_signal, element, merge_props, on_cleanup, ChangeCallback,
    Children, Cleanup, ControllableSignal, ElementProps, EventCallback, MaybeControlled, NodeRef, PropValue,
    RenderAs, RovingFocusGroupItemProps, RovingFocusGroupProps,
};
use crate::types::{Direction, Orientation};

const GROUP_NAME: &str = "ToggleGroup";
const ITEM_NAME: &str = "ToggleGroupItem";

/// Selection mode of a toggle group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleGroupKind {
    Single,
    Multiple,
}

struct ToggleGroupContext {
    kind: ToggleGroupKind,
    value: ControllableSignal<Vec<String>>,
    disabled: PropValue<bool>,
    roving_focus: bool,
}

impl ToggleGroupContext {
    fn is_pressed(&self, item: &str) -> bool {
        self.value.get().iter().any(|value| value == item)
    }

    fn activate(&self, item: &str) {
        match self.kind {
            ToggleGroupKind::Single => self.value.set(vec![item.to_string()]),
            ToggleGroupKind::Multiple => self.value.update(|values| {
                let mut values = values.clone();
                values.push(item.to_string());
                values
            }),
        }
    }

    fn deactivate(&self, item: &str) {
        match self.kind {
            ToggleGroupKind::Single => self.value.set(Vec::new()),
            ToggleGroupKind::Multiple => self.value.update(|values| {
                values.iter().filter(|value| *value != item).cloned().collect()
            }),
        }
    }
}

struct Family {
    context: ScopedContext<ToggleGroupContext>,
    roving_scope: UseScope,
    create_scope: CreateScope,
}

thread_local! {
    static FAMILY: Family = {
        let (factory, create_scope) =
            create_scoped_context_factory(GROUP_NAME, vec![create_roving_focus_group_scope()]);
        Family {
            context: factory.create_context(GROUP_NAME, None),
            roving_scope: create_roving_focus_group_scope().create(),
            create_scope,
        }
    };
}

/// The group context and the roving focus scope derived from `scope`.
fn family(scope: &Scope) -> (ScopedContext<ToggleGroupContext>, Scope) {
    FAMILY.with(|family| (family.context.clone(), family.roving_scope.scope(scope)))
}

/// Scope factory for composites built on toggle groups.
pub fn create_toggle_group_scope() -> CreateScope {
    FAMILY.with(|family| family.create_scope.clone())
}

// =============================================================================
// Group
// =============================================================================

/// Properties for [`toggle_group`].
pub struct ToggleGroupProps {
    pub scope: Scope,
    /// Required.
    pub kind: Option<ToggleGroupKind>,
    /// Pressed values. A single group uses at most one.
    pub value: Option<MaybeControlled<Vec<String>>>,
    pub default_value: Vec<String>,
    pub on_value_change: Option<ChangeCallback<Vec<String>>>,
    pub disabled: PropValue<bool>,
    /// Arrow-key navigation with a single tab stop.
    pub roving_focus: bool,
    pub orientation: Option<Orientation>,
    pub dir: Direction,
    pub loop_: bool,
    pub node_ref: Option<NodeRef>,
    pub children: Option<Children>,
}

impl Default for ToggleGroupProps {
    fn default() -> Self {
        Self {
            scope: Scope::default(),
            kind: None,
            value: None,
            default_value: Vec::new(),
            on_value_change: None,
            disabled: PropValue::Static(false),
            roving_focus: true,
            orientation: None,
            dir: Direction::Ltr,
            loop_: true,
            node_ref: None,
            children: None,
        }
    }
}

/// Mount a toggle group.
pub fn toggle_group(props: ToggleGroupProps) -> Result<Cleanup> {
    let ToggleGroupProps {
        scope,
        kind,
        value,
        default_value,
        on_value_change,
        disabled,
        roving_focus,
        orientation,
        dir,
        loop_,
        node_ref,
        children,
    } = props;

    let Some(kind) = kind else {
        return Err(PrimitiveError::MissingProp {
            component: GROUP_NAME,
            prop: "kind",
        });
    };

    let (context, roving_scope) = family(&scope);
    let state = Rc::new(ToggleGroupContext {
        kind,
        value: create_controllable_array_signal(value, Some(default_value), on_value_change),
        disabled,
        roving_focus,
    });

    let mut group = ElementProps::new("div").attr("role", "group").attr("dir", dir.as_str());
    if let Some(node_ref) = node_ref {
        group = group.node_ref(node_ref);
    }

    Ok(context.provide_rc(&scope, state, move || {
        let children: Children = Box::new(move || {
            if let Some(children) = children {
                children();
            }
        });
        let rendered = if roving_focus {
            roving_focus_group(RovingFocusGroupProps {
                scope: roving_scope,
                orientation,
                dir,
                loop_,
                render_as: RenderAs::child(move |slot| element(merge_props(slot, group))),
                children: Some(children),
                ..Default::default()
            })
        } else {
            group.children = Some(children);
            element(group)
        };
        on_cleanup(rendered);
    }))
}

// =============================================================================
// Item
// =============================================================================

/// Properties for [`toggle_group_item`].
#[derive(Default)]
pub struct ToggleGroupItemProps {
    pub scope: Scope,
    pub value: String,
    pub disabled: PropValue<bool>,
    pub on_click: Option<EventCallback>,
    pub node_ref: Option<NodeRef>,
    pub children: Option<Children>,
}

/// Mount a toggle inside the nearest toggle group.
pub fn toggle_group_item(props: ToggleGroupItemProps) -> Result<Cleanup> {
    let ToggleGroupItemProps {
        scope,
        value,
        disabled,
        on_click,
        node_ref,
        children,
    } = props;

    let (context, roving_scope) = family(&scope);
    let group = context.use_context(ITEM_NAME, &scope)?;

    let pressed: Rc<dyn Fn() -> bool> = {
        let group = group.clone();
        let value = value.clone();
        Rc::new(move || group.is_pressed(&value))
    };
    let is_disabled: Rc<dyn Fn() -> bool> = {
        let group = group.clone();
        Rc::new(move || group.disabled.get() || disabled.get())
    };

    let mut toggle = ElementProps::new("button")
        .attr("type", "button")
        .attr_with("data-state", {
            let pressed = pressed.clone();
            move || Some(if pressed() { "on" } else { "off" }.to_string())
        })
        .attr_with("data-disabled", {
            let is_disabled = is_disabled.clone();
            move || is_disabled().then(String::new)
        })
        .disabled_with({
            let is_disabled = is_disabled.clone();
            move || is_disabled()
        })
        .on_callback(
            EventKind::Click,
            compose_event_handlers(on_click, {
                let pressed = pressed.clone();
                let is_disabled = is_disabled.clone();
                let group = group.clone();
                move |_: &Event| {
                    if is_disabled() {
                        return;
                    }
                    if pressed() {
                        group.deactivate(&value);
                    } else {
                        group.activate(&value);
                    }
                }
            }),
        );
    toggle = match group.kind {
        ToggleGroupKind::Single => toggle.attr("role", "radio").attr_with("aria-checked", {
            let pressed = pressed.clone();
            move || Some(pressed().to_string())
        }),
        ToggleGroupKind::Multiple => toggle.attr_with("aria-pressed", {
            let pressed = pressed.clone();
            move || Some(pressed().to_string())
        }),
    };
    toggle.children = children;

    if !group.roving_focus {
        if let Some(node_ref) = node_ref {
            toggle = toggle.node_ref(node_ref);
        }
        return Ok(element(toggle));
    }

    roving_focus_group_item(RovingFocusGroupItemProps {
        scope: roving_scope,
        focusable: PropValue::getter(move || !is_disabled()),
        active: PropValue::getter(move || pressed()),
        node_ref,
        render_as: RenderAs::child(move |slot| element(merge_props(slot, toggle))),
        ..Default::default()
    })
}

// =============================================================================
// TESTS
// =============================================================================
