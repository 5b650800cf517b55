//! Element Primitive - a node with reactive attributes, styles and listeners.
//!
//! Every primitive renders its DOM through `element`. It:
//! 1. Allocates a node under the current parent
//! 2. Binds props to the node (static once, signals and getters via effects)
//! 3. Attaches listeners for as long as the element is mounted
//! 4. Renders children with this node as parent, under a child owner
//! 5. Returns a cleanup that disposes children and releases the node
//!
//! # Example
//!
//! ```ignore
//! use spark_primitives::primitives::{element, ElementProps};
//! use spark_primitives::engine::events::EventKind;
//! use spark_signals::signal;
//!
//! let open = signal(false);
//! let open_for_attr = open.clone();
//!
//! let cleanup = element(
//!     ElementProps::new("button")
//!         .attr_with("data-state", move || Some(if open_for_attr.get() { "open" } else { "closed" }.into()))
//!         .on(EventKind::Click, move |_| open.set(!open.get()))
//!         .children(|| {
//!             element(ElementProps::new("span"));
//!         }),
//! );
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use spark_signals::{effect, effect_scope};

use super::owner::{owned, with_owner, Owner};
use super::types::{Children, Cleanup, EventCallback, NodeRef, PropListener, PropValue};
use crate::engine::arrays::{attributes, interaction, style};
use crate::engine::events::{listen, Event, EventKind, ListenerOptions};
use crate::engine::{create_node, release_index, with_parent};
use crate::types::PointerEvents;

// =============================================================================
// Props
// =============================================================================

/// Inline style props.
#[derive(Clone, Default)]
pub struct StyleProps {
    pub pointer_events: Option<PropValue<Option<PointerEvents>>>,
    pub display_none: Option<PropValue<bool>>,
    pub visibility_hidden: Option<PropValue<bool>>,
    pub animation_name: Option<PropValue<Option<String>>>,
}

/// Properties for [`element`].
#[derive(Default)]
pub struct ElementProps {
    /// Tag name (default: `div`).
    pub tag: Option<String>,
    pub id: Option<String>,
    /// Attributes. A `None` value removes the attribute.
    pub attributes: Vec<(String, PropValue<Option<String>>)>,
    pub tab_index: Option<PropValue<Option<i32>>>,
    pub disabled: Option<PropValue<bool>>,
    pub style: StyleProps,
    pub listeners: Vec<PropListener>,
    /// Refs set to the node while it exists.
    pub refs: Vec<NodeRef>,
    pub children: Option<Children>,
}

impl ElementProps {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Default::default()
        }
    }

    /// Static attribute.
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes
            .push((name.to_string(), PropValue::Static(Some(value.into()))));
        self
    }

    /// Reactive attribute.
    pub fn attr_with(mut self, name: &str, getter: impl Fn() -> Option<String> + 'static) -> Self {
        self.attributes
            .push((name.to_string(), PropValue::getter(getter)));
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn tab_index(mut self, value: impl Into<PropValue<Option<i32>>>) -> Self {
        self.tab_index = Some(value.into());
        self
    }

    pub fn tab_index_with(mut self, getter: impl Fn() -> Option<i32> + 'static) -> Self {
        self.tab_index = Some(PropValue::getter(getter));
        self
    }

    pub fn disabled_with(mut self, getter: impl Fn() -> bool + 'static) -> Self {
        self.disabled = Some(PropValue::getter(getter));
        self
    }

    pub fn pointer_events_with(mut self, getter: impl Fn() -> Option<PointerEvents> + 'static) -> Self {
        self.style.pointer_events = Some(PropValue::getter(getter));
        self
    }

    /// Bubble-phase listener.
    pub fn on(mut self, kind: EventKind, handler: impl Fn(&Event) + 'static) -> Self {
        self.listeners.push(PropListener::new(kind, handler));
        self
    }

    /// Capture-phase listener.
    pub fn on_capture(mut self, kind: EventKind, handler: impl Fn(&Event) + 'static) -> Self {
        self.listeners.push(PropListener::capture(kind, handler));
        self
    }

    /// Bubble-phase listener from a shared callback.
    pub fn on_callback(mut self, kind: EventKind, handler: EventCallback) -> Self {
        self.listeners.push(PropListener {
            kind,
            options: ListenerOptions::default(),
            handler,
        });
        self
    }

    pub fn node_ref(mut self, node_ref: NodeRef) -> Self {
        self.refs.push(node_ref);
        self
    }

    pub fn children(mut self, children: impl FnOnce() + 'static) -> Self {
        self.children = Some(Box::new(children));
        self
    }

    /// The attribute value as currently bound (untracked for static values).
    pub fn attribute(&self, name: &str) -> Option<&PropValue<Option<String>>> {
        self.attributes
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

// =============================================================================
// Helper: Bind PropValue to the node
// =============================================================================

/// Apply a prop once when static, re-apply on change otherwise.
macro_rules! bind_prop {
    ($prop:expr, $apply:expr) => {{
        let apply = $apply;
        match $prop {
            PropValue::Static(v) => apply(v),
            reactive => {
                let _stop = effect(move || apply(reactive.get()));
            }
        }
    }};
}

// =============================================================================
// Element Component
// =============================================================================

/// Create an element.
///
/// Returns a cleanup function that releases the node and everything
/// rendered under it.
pub fn element(props: ElementProps) -> Cleanup {
    let ElementProps {
        tag,
        id,
        attributes: attrs,
        tab_index,
        disabled,
        style: style_props,
        listeners,
        refs,
        children,
    } = props;

    // 1. ALLOCATE NODE
    let index = create_node(tag.as_deref().unwrap_or("div"), id.as_deref());
    for node_ref in &refs {
        node_ref.set(Some(index));
    }

    let owner = Owner::child_of_current();
    let owner_for_children = owner.clone();
    let scope = effect_scope(false);
    let listener_cleanups: Rc<RefCell<Vec<Cleanup>>> = Rc::default();
    let listener_cleanups_run = listener_cleanups.clone();

    scope.run(move || {
        // 2. BIND ATTRIBUTES
        for (name, value) in attrs {
            bind_prop!(value, move |v: Option<String>| {
                attributes::set_optional_attribute(index, &name, v.as_deref())
            });
        }
        if let Some(tab_index) = tab_index {
            bind_prop!(tab_index, move |v| interaction::set_tab_index(index, v));
        }
        if let Some(disabled) = disabled {
            bind_prop!(disabled, move |v| interaction::set_disabled(index, v));
        }

        // 3. BIND STYLE
        if let Some(pointer_events) = style_props.pointer_events {
            bind_prop!(pointer_events, move |v| style::set_pointer_events(index, v));
        }
        if let Some(display_none) = style_props.display_none {
            bind_prop!(display_none, move |v| style::set_display_none(index, v));
        }
        if let Some(hidden) = style_props.visibility_hidden {
            bind_prop!(hidden, move |v| style::set_visibility_hidden(index, v));
        }
        if let Some(name) = style_props.animation_name {
            bind_prop!(name, move |v: Option<String>| style::set_animation_name(index, v.as_deref()));
        }

        // 4. LISTENERS
        let mut cleanups = listener_cleanups.borrow_mut();
        for PropListener { kind, options, handler } in listeners {
            cleanups.push(listen(index, kind, options, move |event: &Event| handler(event)));
        }
        drop(cleanups);

        // 5. CHILDREN
        if let Some(children) = children {
            with_owner(&owner_for_children, || with_parent(index, children));
        }
    });

    // 6. RETURN CLEANUP
    owned(Box::new(move || {
        owner.dispose();
        scope.stop();
        for cleanup in listener_cleanups_run.borrow_mut().drain(..) {
            cleanup();
        }
        for node_ref in &refs {
            if node_ref.peek() == Some(index) {
                node_ref.set(None);
            }
        }
        release_index(index);
    }))
}

// =============================================================================
// TESTS
// =============================================================================
