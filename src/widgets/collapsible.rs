//! Collapsible - a trigger that shows and hides a content region.
//!
//! ```ignore
//! collapsible(CollapsibleProps {
//!     default_open: true,
//!     children: Some(Box::new(|| {
//!         collapsible_trigger(CollapsibleTriggerProps::default())?;
//!         collapsible_content(CollapsibleContentProps {
//!             children: Some(Rc::new(|| { /* body */ })),
//!             ..Default::default()
//!         })?;
//!     })),
//!     ..Default::default()
//! });
//! ```
//!
//! The content mounts through [`presence`], so a closing animation on
//! `[data-state="closed"]` keeps it in the tree until it finishes.

use std::rc::Rc;

use crate::engine::events::{Event, EventKind};
use crate::engine::generate_id;
use crate::error::Result;
use crate::primitives::context::{create_scoped_context_factory, CreateScope, Scope, ScopedContext};
use crate::primitives::{
    compose_event_handlers, create_controllable_boolean_signal, element, on_cleanup, presence,
    ChangeCallback, Children, Cleanup, ControllableSignal, ElementProps, EventCallback, MaybeControlled,
    NodeRef, PresenceHandle, PresenceProps, PropValue, RenderAs,
};

const COLLAPSIBLE_NAME: &str = "Collapsible";
const TRIGGER_NAME: &str = "CollapsibleTrigger";
const CONTENT_NAME: &str = "CollapsibleContent";

struct CollapsibleContext {
    content_id: String,
    disabled: PropValue<bool>,
    open: ControllableSignal<bool>,
}

impl CollapsibleContext {
    fn toggle(&self) {
        self.open.update(|open| !open);
    }
}

struct Family {
    context: ScopedContext<CollapsibleContext>,
    create_scope: CreateScope,
}

thread_local! {
    static FAMILY: Family = {
        let (factory, create_scope) = create_scoped_context_factory(COLLAPSIBLE_NAME, vec![]);
        Family {
            context: factory.create_context(COLLAPSIBLE_NAME, None),
            create_scope,
        }
    };
}

fn context() -> ScopedContext<CollapsibleContext> {
    FAMILY.with(|family| family.context.clone())
}

/// Scope factory for composites that nest collapsibles.
pub fn create_collapsible_scope() -> CreateScope {
    FAMILY.with(|family| family.create_scope.clone())
}

fn open_state(open: bool) -> String {
    if open { "open" } else { "closed" }.to_string()
}

fn disabled_marker(disabled: bool) -> Option<String> {
    disabled.then(String::new)
}

// =============================================================================
// Root
// =============================================================================

/// Properties for [`collapsible`].
#[derive(Default)]
pub struct CollapsibleProps {
    pub scope: Scope,
    pub open: Option<MaybeControlled<bool>>,
    pub default_open: bool,
    pub on_open_change: Option<ChangeCallback<bool>>,
    pub disabled: PropValue<bool>,
    pub node_ref: Option<NodeRef>,
    pub render_as: RenderAs,
    pub children: Option<Children>,
}

/// Mount a collapsible root.
pub fn collapsible(props: CollapsibleProps) -> Cleanup {
    let CollapsibleProps {
        scope,
        open,
        default_open,
        on_open_change,
        disabled,
        node_ref,
        render_as,
        children,
    } = props;

    let state = Rc::new(CollapsibleContext {
        content_id: generate_id("collapsible-content"),
        disabled: disabled.clone(),
        open: create_controllable_boolean_signal(open, Some(default_open), on_open_change),
    });

    let mut root = ElementProps::new("div")
        .attr_with("data-state", {
            let state = state.clone();
            move || Some(open_state(state.open.get()))
        })
        .attr_with("data-disabled", move || disabled_marker(disabled.get()));
    if let Some(node_ref) = node_ref {
        root = root.node_ref(node_ref);
    }

    root.children = Some(Box::new(move || {
        on_cleanup(context().provide_rc(&scope, state, move || {
            if let Some(children) = children {
                children();
            }
        }));
    }));
    render_as.render(root)
}

// =============================================================================
// Trigger
// =============================================================================

/// Properties for [`collapsible_trigger`].
#[derive(Default)]
pub struct CollapsibleTriggerProps {
    pub scope: Scope,
    pub on_click: Option<EventCallback>,
    pub node_ref: Option<NodeRef>,
    pub render_as: RenderAs,
    pub children: Option<Children>,
}

/// Mount the button that toggles the nearest collapsible.
pub fn collapsible_trigger(props: CollapsibleTriggerProps) -> Result<Cleanup> {
    let state = context().use_context(TRIGGER_NAME, &props.scope)?;

    let mut trigger = ElementProps::new("button")
        .attr("type", "button")
        .attr("aria-controls", state.content_id.clone())
        .attr_with("aria-expanded", {
            let state = state.clone();
            move || Some(state.open.get().to_string())
        })
        .attr_with("data-state", {
            let state = state.clone();
            move || Some(open_state(state.open.get()))
        })
        .attr_with("data-disabled", {
            let state = state.clone();
            move || disabled_marker(state.disabled.get())
        })
        .disabled_with({
            let state = state.clone();
            move || state.disabled.get()
        })
        .on_callback(
            EventKind::Click,
            compose_event_handlers(props.on_click, move |_: &Event| state.toggle()),
        );
    if let Some(node_ref) = props.node_ref {
        trigger = trigger.node_ref(node_ref);
    }
    trigger.children = props.children;
    Ok(props.render_as.render(trigger))
}

// =============================================================================
// Content
// =============================================================================

/// Properties for [`collapsible_content`].
#[derive(Default)]
pub struct CollapsibleContentProps {
    pub scope: Scope,
    /// Keep the content mounted while closed.
    pub force_mount: bool,
    pub node_ref: Option<NodeRef>,
    /// Rendered each time the content mounts.
    pub children: Option<Rc<dyn Fn()>>,
}

/// Mount the region the nearest collapsible shows and hides.
pub fn collapsible_content(props: CollapsibleContentProps) -> Result<Cleanup> {
    let CollapsibleContentProps {
        scope,
        force_mount,
        node_ref,
        children,
    } = props;
    let state = context().use_context(CONTENT_NAME, &scope)?;

    let present_state = state.clone();
    let cleanup = presence(PresenceProps {
        present: Rc::new(move || force_mount || present_state.open.get()),
        force_mount: false,
        children: Rc::new(move |handle: &PresenceHandle| render_content(&state, handle, node_ref.clone(), children.clone())),
    });
    Ok(cleanup)
}

fn render_content(
    state: &Rc<CollapsibleContext>,
    handle: &PresenceHandle,
    node_ref: Option<NodeRef>,
    children: Option<Rc<dyn Fn()>>,
) -> Cleanup {
    let content_ref = node_ref.unwrap_or_default();

    let mut content = ElementProps::new("div")
        .id(state.content_id.clone())
        .node_ref(content_ref.clone())
        .attr_with("data-state", {
            let state = state.clone();
            move || Some(open_state(state.open.get()))
        })
        .attr_with("data-disabled", {
            let state = state.clone();
            move || disabled_marker(state.disabled.get())
        });
    // Hidden once fully closed but still force-mounted.
    content.style.display_none = Some(PropValue::getter({
        let state = state.clone();
        let handle = handle.clone();
        move || !(state.open.get() || handle.is_present())
    }));
    if let Some(children) = children {
        content = content.children(move || children());
    }

    let rendered = element(content);
    handle.register_node(content_ref.peek());
    let handle = handle.clone();
    Box::new(move || {
        handle.register_node(None);
        rendered();
    })
}

// =============================================================================
// TESTS
// =============================================================================
