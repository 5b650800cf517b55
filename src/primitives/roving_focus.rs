//! Roving Focus Group - one tab stop for a group, arrow keys move between items.
//!
//! The group is a collection provider plus a scoped context holding the
//! current tab stop. Exactly one item carries `tab_index = 0`:
//!
//! ```text
//! item       0  iff it is the current tab stop and the group is not tabbing out
//! container  0  iff no focusable item holds the tab stop and not tabbing out
//! ```
//!
//! The container keeps 0 while focusable items exist but none is the tab
//! stop yet, so a fresh group is reachable with Tab; entry focus then
//! hands focus to an item.
//!
//! Shift+Tab on an item marks the group as tabbing back out, which drops
//! every tab index to -1 so the browser-style default action leaves the
//! group entirely. The flag clears on the group's next `FocusOut`.
//!
//! Keyboard focus landing on the container itself ("entry focus") is
//! forwarded to the active item, else the current tab stop, else the first
//! focusable item.
//!
//! ```ignore
//! roving_focus_group(RovingFocusGroupProps {
//!     orientation: Some(Orientation::Horizontal),
//!     children: Some(Box::new(|| {
//!         for id in ["bold", "italic"] {
//!             roving_focus_group_item(RovingFocusGroupItemProps {
//!                 tab_stop_id: Some(id.into()),
//!                 ..Default::default()
//!             })?;
//!         }
//!     })),
//!     ..Default::default()
//! });
//! ```

use std::cell::Cell;
use std::rc::Rc;

use spark_signals::{effect, effect_scope, signal, untrack, Signal};

use super::collection::{create_collection, Collection, ItemsGetter};
use super::context::{create_scoped_context_factory, CreateScope, Scope, ScopedContext};
use super::controllable::{create_controllable_signal, ControllableProps, ControllableSignal};
use super::element::ElementProps;
use super::owner::{on_cleanup, owned};
use super::slot::{compose_event_handlers, RenderAs};
use super::types::{noop_cleanup, ChangeCallback, Children, Cleanup, EventCallback, MaybeControlled, NodeRef, PropValue};
use crate::engine::events::{dispatch_event, Event, EventKind, EventTarget};
use crate::engine::generate_id;
use crate::error::Result;
use crate::state::focus::{active_element, focus};
use crate::types::{Direction, FocusIntent, Orientation};

const GROUP_NAME: &str = "RovingFocusGroup";
const ITEM_NAME: &str = "RovingFocusGroupItem";

/// Custom event raised on the container when keyboard focus enters it.
/// Prevent default to keep focus on the container.
pub const ENTRY_FOCUS: &str = "rovingFocusGroup.onEntryFocus";

// =============================================================================
// Family
// =============================================================================

/// Metadata each item registers into the group's collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemData {
    pub id: String,
    pub focusable: bool,
    pub active: bool,
}

struct RovingContext {
    orientation: Option<Orientation>,
    dir: Direction,
    loop_: bool,
    current_tab_stop_id: ControllableSignal<Option<String>>,
    tabbing_back_out: Signal<bool>,
    focusable_count: Signal<usize>,
}

impl RovingContext {
    fn on_item_focus(&self, id: &str) {
        self.current_tab_stop_id.set(Some(id.to_string()));
    }

    fn on_item_shift_tab(&self) {
        self.tabbing_back_out.set(true);
    }

    fn adjust_focusable_count(&self, delta: isize) {
        let count = untrack(|| self.focusable_count.get());
        self.focusable_count.set(count.saturating_add_signed(delta));
    }
}

struct Family {
    collection: Collection<ItemData>,
    context: ScopedContext<RovingContext>,
    create_scope: CreateScope,
}

impl Family {
    fn new() -> Self {
        let (collection, create_collection_scope) = create_collection::<ItemData>(GROUP_NAME);
        let (factory, create_scope) = create_scoped_context_factory(GROUP_NAME, vec![create_collection_scope]);
        let context = factory.create_context::<RovingContext>(GROUP_NAME, None);
        Self {
            collection,
            context,
            create_scope,
        }
    }
}

thread_local! {
    static FAMILY: Family = Family::new();
}

fn family() -> (Collection<ItemData>, ScopedContext<RovingContext>) {
    FAMILY.with(|family| (family.collection.clone(), family.context.clone()))
}

/// Scope factory for composites built on roving focus (covers its
/// collection too).
pub fn create_roving_focus_group_scope() -> CreateScope {
    FAMILY.with(|family| family.create_scope.clone())
}

// =============================================================================
// Navigation Helpers
// =============================================================================

/// Map a key to a focus intent, honoring orientation and text direction.
pub fn focus_intent(key: &str, orientation: Option<Orientation>, dir: Direction) -> Option<FocusIntent> {
    let key = match (dir, key) {
        (Direction::Rtl, "ArrowLeft") => "ArrowRight",
        (Direction::Rtl, "ArrowRight") => "ArrowLeft",
        _ => key,
    };
    match (orientation, key) {
        (Some(Orientation::Vertical), "ArrowLeft" | "ArrowRight") => None,
        (Some(Orientation::Horizontal), "ArrowUp" | "ArrowDown") => None,
        (_, "ArrowLeft" | "ArrowUp") => Some(FocusIntent::Prev),
        (_, "ArrowRight" | "ArrowDown") => Some(FocusIntent::Next),
        (_, "Home" | "PageUp") => Some(FocusIntent::First),
        (_, "End" | "PageDown") => Some(FocusIntent::Last),
        _ => None,
    }
}

/// Rotate `items` so it starts at `start` (modulo its length).
pub fn wrap_array<T: Clone>(items: &[T], start: usize) -> Vec<T> {
    let len = items.len();
    (0..len).map(|offset| items[(start + offset) % len].clone()).collect()
}

/// Focus the first candidate that accepts focus. Stops early when a
/// candidate is already the active element. Returns whether focus moved.
pub fn focus_first(candidates: &[usize]) -> bool {
    let previously_focused = active_element();
    for &candidate in candidates {
        if candidate == previously_focused {
            return false;
        }
        focus(candidate);
        if active_element() != previously_focused {
            return true;
        }
    }
    false
}

// =============================================================================
// Group
// =============================================================================

/// Properties for [`roving_focus_group`].
#[derive(Default)]
pub struct RovingFocusGroupProps {
    /// Scope from an enclosing composite.
    pub scope: Scope,
    /// `None` lets every arrow key navigate.
    pub orientation: Option<Orientation>,
    pub dir: Direction,
    /// Wrap from the last item to the first and back.
    pub loop_: bool,
    pub current_tab_stop_id: Option<MaybeControlled<String>>,
    pub default_current_tab_stop_id: Option<String>,
    pub on_current_tab_stop_id_change: Option<ChangeCallback<Option<String>>>,
    /// Listener for [`ENTRY_FOCUS`].
    pub on_entry_focus: Option<EventCallback>,
    pub node_ref: Option<NodeRef>,
    pub render_as: RenderAs,
    pub children: Option<Children>,
}

/// Mount a roving focus group.
pub fn roving_focus_group(props: RovingFocusGroupProps) -> Cleanup {
    let (collection, context) = family();
    let scope = props.scope.clone();
    let provider_collection = collection.clone();
    collection.provider(&scope, move || {
        on_cleanup(render_group(props, provider_collection, context));
    })
}

fn container_tab_index(context: &RovingContext, items: &ItemsGetter<ItemData>) -> i32 {
    if context.tabbing_back_out.get() {
        return -1;
    }
    if context.focusable_count.get() == 0 {
        return 0;
    }
    let current = context.current_tab_stop_id.get();
    let held = items
        .get()
        .iter()
        .any(|item| item.data.focusable && current.as_ref() == Some(&item.data.id));
    if held { -1 } else { 0 }
}

fn entry_focus(context: &RovingContext, items: &ItemsGetter<ItemData>, container: usize) {
    let event = Event::new(EventKind::Custom(ENTRY_FOCUS), container)
        .with_bubbles(false)
        .with_cancelable(true);
    if !dispatch_event(&event) {
        return;
    }

    let items: Vec<_> = items.get().into_iter().filter(|item| item.data.focusable).collect();
    let current = context.current_tab_stop_id.get();
    let active_item = items.iter().find(|item| item.data.active);
    let current_item = items.iter().find(|item| current.as_ref() == Some(&item.data.id));
    let candidates: Vec<usize> = active_item
        .into_iter()
        .chain(current_item)
        .chain(items.iter())
        .map(|item| item.node)
        .collect();
    focus_first(&candidates);
}

fn render_group(props: RovingFocusGroupProps, collection: Collection<ItemData>, context: ScopedContext<RovingContext>) -> Cleanup {
    let RovingFocusGroupProps {
        scope,
        orientation,
        dir,
        loop_,
        current_tab_stop_id,
        default_current_tab_stop_id,
        on_current_tab_stop_id_change,
        on_entry_focus,
        node_ref,
        render_as,
        children,
    } = props;

    let items = match collection.use_collection(&scope) {
        Ok(items) => items,
        Err(err) => {
            log::error!("{err}");
            return noop_cleanup();
        }
    };

    let prop = current_tab_stop_id.map(|prop| -> MaybeControlled<Option<String>> { Rc::new(move || prop().map(Some)) });
    let roving = Rc::new(RovingContext {
        orientation,
        dir,
        loop_,
        current_tab_stop_id: create_controllable_signal(ControllableProps {
            prop,
            default_prop: default_current_tab_stop_id,
            on_change: on_current_tab_stop_id_change,
        }),
        tabbing_back_out: signal(false),
        focusable_count: signal(0),
    });

    let node_ref = node_ref.unwrap_or_default();
    let click_focus = Rc::new(Cell::new(false));

    let mut element = ElementProps::new("div")
        .node_ref(node_ref.clone())
        .attr("dir", dir.as_str());
    if let Some(orientation) = orientation {
        element = element.attr("data-orientation", orientation.as_str());
    }
    element = element
        .tab_index_with({
            let roving = roving.clone();
            let items = items.clone();
            move || Some(container_tab_index(&roving, &items))
        })
        .on_capture(EventKind::MouseDown, {
            let click_focus = click_focus.clone();
            move |_| click_focus.set(true)
        })
        .on(EventKind::FocusIn, {
            let roving = roving.clone();
            move |event: &Event| {
                let keyboard_focus = !click_focus.get();
                if let EventTarget::Node(container) = event.target() {
                    let on_container = event.current_target() == Some(event.target());
                    if on_container && keyboard_focus && !roving.tabbing_back_out.get() {
                        entry_focus(&roving, &items, container);
                    }
                }
                click_focus.set(false);
            }
        })
        .on(EventKind::FocusOut, {
            let roving = roving.clone();
            move |_| {
                roving.tabbing_back_out.set(false);
            }
        });
    if let Some(handler) = on_entry_focus {
        element = element.on_callback(EventKind::Custom(ENTRY_FOCUS), handler);
    }

    let child_scope = scope.clone();
    element.children = Some(Box::new(move || {
        on_cleanup(context.provide_rc(&child_scope, roving, move || {
            if let Some(children) = children {
                children();
            }
        }));
    }));

    let rendered = render_as.render(element);
    if let Some(container) = node_ref.peek() {
        match collection.slot(&scope, container) {
            Ok(slot) => on_cleanup(slot),
            Err(err) => log::error!("{err}"),
        }
    }
    rendered
}

// =============================================================================
// Item
// =============================================================================

/// Properties for [`roving_focus_group_item`].
pub struct RovingFocusGroupItemProps {
    pub scope: Scope,
    /// Identity of this item's tab stop (generated when `None`).
    pub tab_stop_id: Option<String>,
    /// Unfocusable items are skipped by navigation and ignore presses.
    pub focusable: PropValue<bool>,
    /// Preferred target of entry focus.
    pub active: PropValue<bool>,
    pub on_mouse_down: Option<EventCallback>,
    pub on_focus: Option<EventCallback>,
    pub on_key_down: Option<EventCallback>,
    pub node_ref: Option<NodeRef>,
    pub render_as: RenderAs,
    pub children: Option<Children>,
}

impl Default for RovingFocusGroupItemProps {
    fn default() -> Self {
        Self {
            scope: Scope::default(),
            tab_stop_id: None,
            focusable: PropValue::Static(true),
            active: PropValue::Static(false),
            on_mouse_down: None,
            on_focus: None,
            on_key_down: None,
            node_ref: None,
            render_as: RenderAs::default(),
            children: None,
        }
    }
}

fn handle_item_key_down(event: &Event, context: &RovingContext, items: &ItemsGetter<ItemData>) {
    let Some(key) = event.key() else { return };
    if key.key == "Tab" && key.shift() {
        context.on_item_shift_tab();
        return;
    }
    let Some(EventTarget::Node(current)) = event.current_target() else {
        return;
    };
    if event.target_node() != Some(current) {
        return;
    }
    let Some(intent) = focus_intent(&key.key, context.orientation, context.dir) else {
        return;
    };
    if key.has_modifier() {
        return;
    }
    event.prevent_default();

    let mut candidates: Vec<usize> = items
        .get()
        .into_iter()
        .filter(|item| item.data.focusable)
        .map(|item| item.node)
        .collect();
    match intent {
        FocusIntent::First => {}
        FocusIntent::Last => candidates.reverse(),
        FocusIntent::Prev | FocusIntent::Next => {
            if intent == FocusIntent::Prev {
                candidates.reverse();
            }
            let start = candidates
                .iter()
                .position(|&node| node == current)
                .map_or(0, |index| index + 1);
            candidates = if context.loop_ {
                wrap_array(&candidates, start)
            } else {
                candidates.split_off(start.min(candidates.len()))
            };
        }
    }
    focus_first(&candidates);
}

/// Mount an item inside the nearest roving focus group.
pub fn roving_focus_group_item(props: RovingFocusGroupItemProps) -> Result<Cleanup> {
    let RovingFocusGroupItemProps {
        scope,
        tab_stop_id,
        focusable,
        active,
        on_mouse_down,
        on_focus,
        on_key_down,
        node_ref,
        render_as,
        children,
    } = props;

    let (collection, context) = family();
    let roving = context.use_context(ITEM_NAME, &scope)?;
    let items = collection.use_collection(&scope)?;
    let id = tab_stop_id.unwrap_or_else(|| generate_id("roving-focus-item"));
    let node_ref = node_ref.unwrap_or_default();

    let mut element = ElementProps::new("span")
        .node_ref(node_ref.clone())
        .tab_index_with({
            let roving = roving.clone();
            let id = id.clone();
            move || {
                let is_tab_stop = roving.current_tab_stop_id.get().as_deref() == Some(id.as_str());
                Some(if is_tab_stop && !roving.tabbing_back_out.get() { 0 } else { -1 })
            }
        })
        .on_callback(
            EventKind::MouseDown,
            compose_event_handlers(on_mouse_down, {
                let roving = roving.clone();
                let focusable = focusable.clone();
                let id = id.clone();
                move |event: &Event| {
                    if focusable.get() {
                        roving.on_item_focus(&id);
                    } else {
                        // Unfocusable items keep focus where it is.
                        event.prevent_default();
                    }
                }
            }),
        )
        .on_callback(
            EventKind::FocusIn,
            compose_event_handlers(on_focus, {
                let roving = roving.clone();
                let id = id.clone();
                move |_| roving.on_item_focus(&id)
            }),
        )
        .on_callback(
            EventKind::KeyDown,
            compose_event_handlers(on_key_down, {
                let roving = roving.clone();
                move |event: &Event| handle_item_key_down(event, &roving, &items)
            }),
        );
    if let Some(orientation) = roving.orientation {
        element = element.attr("data-orientation", orientation.as_str());
    }
    element.children = children;

    let rendered = render_as.render(element);
    let Some(node) = node_ref.peek() else {
        log::warn!("{ITEM_NAME} rendered without attaching its node ref");
        return Ok(rendered);
    };

    let data_focusable = focusable.clone();
    let registered = collection.item(&scope, node, move || ItemData {
        id: id.clone(),
        focusable: data_focusable.get(),
        active: active.get(),
    })?;

    // Live count of focusable items.
    let counted = Rc::new(Cell::new(false));
    let counted_effect = counted.clone();
    let count_context = roving.clone();
    let count_scope = effect_scope(false);
    count_scope.run(move || {
        let _stop = effect(move || {
            let now = focusable.get();
            if now != counted_effect.get() {
                counted_effect.set(now);
                untrack(|| count_context.adjust_focusable_count(if now { 1 } else { -1 }));
            }
        });
    });

    Ok(owned(Box::new(move || {
        count_scope.stop();
        if counted.get() {
            roving.adjust_focusable_count(-1);
        }
        registered();
        rendered();
    })))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::arrays::interaction;
    use crate::engine::create_node;
    use crate::error::PrimitiveError;
    use crate::state::focus::focused_node;
    use crate::state::keyboard::{key_down, KeyboardEvent, Modifiers};
    use crate::state::pointer::pointer_down;
    use crate::types::PointerType;
    use std::cell::RefCell;

    fn setup() {
        crate::reset_all();
    }

    struct Group {
        container: usize,
        items: Vec<usize>,
        _cleanup: Cleanup,
    }

    fn mount(props: RovingFocusGroupProps, ids: &[&'static str], unfocusable: &[&'static str]) -> Group {
        let container_ref = NodeRef::new();
        let item_refs: Rc<RefCell<Vec<NodeRef>>> = Rc::default();
        let item_refs_inner = item_refs.clone();
        let ids = ids.to_vec();
        let unfocusable = unfocusable.to_vec();

        let cleanup = roving_focus_group(RovingFocusGroupProps {
            node_ref: Some(container_ref.clone()),
            children: Some(Box::new(move || {
                for id in ids {
                    let node_ref = NodeRef::new();
                    roving_focus_group_item(RovingFocusGroupItemProps {
                        tab_stop_id: Some(id.to_string()),
                        focusable: PropValue::Static(!unfocusable.contains(&id)),
                        node_ref: Some(node_ref.clone()),
                        ..Default::default()
                    })
                    .unwrap();
                    item_refs_inner.borrow_mut().push(node_ref);
                }
            })),
            ..props
        });

        let items = item_refs.borrow().iter().map(|r| r.peek().unwrap()).collect();
        Group {
            container: container_ref.peek().unwrap(),
            items,
            _cleanup: cleanup,
        }
    }

    fn tab_indices(group: &Group) -> Vec<Option<i32>> {
        group.items.iter().map(|&item| interaction::get_tab_index(item)).collect()
    }

    fn press(key: &str) {
        key_down(KeyboardEvent::new(key));
    }

    #[test]
    fn test_single_tab_stop_follows_focus() {
        setup();

        let group = mount(RovingFocusGroupProps::default(), &["a", "b", "c"], &[]);
        assert_eq!(interaction::get_tab_index(group.container), Some(0));
        assert_eq!(tab_indices(&group), vec![Some(-1), Some(-1), Some(-1)]);

        focus(group.items[1]);
        assert_eq!(tab_indices(&group), vec![Some(-1), Some(0), Some(-1)]);
        assert_eq!(interaction::get_tab_index(group.container), Some(-1));
    }

    #[test]
    fn test_container_is_tab_stop_without_focusable_items() {
        setup();

        let group = mount(
            RovingFocusGroupProps {
                default_current_tab_stop_id: Some("a".into()),
                ..Default::default()
            },
            &["a"],
            &["a"],
        );
        assert_eq!(interaction::get_tab_index(group.container), Some(0));
    }

    #[test]
    fn test_next_without_loop_stops_at_end() {
        setup();

        let group = mount(
            RovingFocusGroupProps {
                orientation: Some(Orientation::Horizontal),
                ..Default::default()
            },
            &["a", "b", "c"],
            &[],
        );
        focus(group.items[0]);
        press("ArrowRight");
        assert_eq!(focused_node(), Some(group.items[1]));
        press("ArrowRight");
        press("ArrowRight");
        assert_eq!(focused_node(), Some(group.items[2]));
    }

    #[test]
    fn test_loop_wraps() {
        setup();

        let group = mount(
            RovingFocusGroupProps {
                loop_: true,
                ..Default::default()
            },
            &["a", "b", "c"],
            &[],
        );
        focus(group.items[2]);
        press("ArrowDown");
        assert_eq!(focused_node(), Some(group.items[0]));
        press("ArrowUp");
        assert_eq!(focused_node(), Some(group.items[2]));
    }

    #[test]
    fn test_orientation_and_direction() {
        setup();

        let group = mount(
            RovingFocusGroupProps {
                orientation: Some(Orientation::Vertical),
                ..Default::default()
            },
            &["a", "b"],
            &[],
        );
        focus(group.items[0]);
        press("ArrowRight");
        assert_eq!(focused_node(), Some(group.items[0]));
        press("ArrowDown");
        assert_eq!(focused_node(), Some(group.items[1]));

        assert_eq!(focus_intent("ArrowLeft", None, Direction::Rtl), Some(FocusIntent::Next));
        assert_eq!(focus_intent("ArrowUp", Some(Orientation::Horizontal), Direction::Ltr), None);
        assert_eq!(focus_intent("PageDown", None, Direction::Ltr), Some(FocusIntent::Last));
    }

    #[test]
    fn test_home_end_and_unfocusable_items() {
        setup();

        let group = mount(RovingFocusGroupProps::default(), &["a", "b", "c", "d"], &["d"]);
        focus(group.items[1]);
        press("End");
        assert_eq!(focused_node(), Some(group.items[2]));
        press("Home");
        assert_eq!(focused_node(), Some(group.items[0]));
    }

    #[test]
    fn test_modified_keys_are_not_intercepted() {
        setup();

        let group = mount(RovingFocusGroupProps::default(), &["a", "b"], &[]);
        focus(group.items[0]);
        assert!(key_down(KeyboardEvent::with_modifiers("ArrowRight", Modifiers::CTRL)));
        assert_eq!(focused_node(), Some(group.items[0]));
    }

    #[test]
    fn test_keyboard_entry_focuses_current_tab_stop() {
        setup();

        let before = create_node("button", None);
        let group = mount(
            RovingFocusGroupProps {
                default_current_tab_stop_id: Some("b".into()),
                ..Default::default()
            },
            &["a", "b", "c"],
            &[],
        );
        focus(before);
        press("Tab");
        assert_eq!(focused_node(), Some(group.items[1]));
    }

    #[test]
    fn test_entry_focus_goes_to_first_item() {
        setup();

        let group = mount(RovingFocusGroupProps::default(), &["a", "b"], &[]);
        press("Tab");
        assert_eq!(focused_node(), Some(group.items[0]));
    }

    #[test]
    fn test_prevented_entry_focus_stays_on_container() {
        setup();

        let group = mount(
            RovingFocusGroupProps {
                on_entry_focus: Some(Rc::new(|event: &Event| event.prevent_default())),
                ..Default::default()
            },
            &["a", "b"],
            &[],
        );
        press("Tab");
        assert_eq!(focused_node(), Some(group.container));
    }

    #[test]
    fn test_mouse_focus_on_container_is_not_entry() {
        setup();

        let group = mount(RovingFocusGroupProps::default(), &["a"], &[]);
        pointer_down(group.container, PointerType::Mouse);
        assert_eq!(focused_node(), Some(group.container));
    }

    #[test]
    fn test_shift_tab_leaves_group() {
        setup();

        let before = create_node("button", None);
        let group = mount(RovingFocusGroupProps::default(), &["a", "b", "c"], &[]);
        focus(group.items[1]);

        key_down(KeyboardEvent::with_modifiers("Tab", Modifiers::SHIFT));
        assert_eq!(focused_node(), Some(before));
        assert_eq!(tab_indices(&group), vec![Some(-1), Some(0), Some(-1)]);

        press("Tab");
        assert_eq!(focused_node(), Some(group.items[1]));
    }

    #[test]
    fn test_item_without_group_is_an_error() {
        setup();

        let err = roving_focus_group_item(RovingFocusGroupItemProps::default()).err();
        assert_eq!(
            err,
            Some(PrimitiveError::MissingProvider {
                consumer: "RovingFocusGroupItem".into(),
                provider: "RovingFocusGroup".into(),
            })
        );
    }

    #[test]
    fn test_wrap_array() {
        assert_eq!(wrap_array(&[1, 2, 3], 1), vec![2, 3, 1]);
        assert_eq!(wrap_array(&[1, 2, 3], 3), vec![1, 2, 3]);
        assert!(wrap_array::<i32>(&[], 2).is_empty());
    }
}
