//! Collection - mounted item nodes with metadata, read back in document order.
//!
//! ```ignore
//! let (collection, create_scope) = create_collection::<ItemData>("Tabs");
//!
//! collection.provider(&scope, move || {
//!     // container
//!     element(ElementProps::new("div").node_ref(container.clone()).children(move || {
//!         // each item registers its node and (reactive) metadata
//!         collection.item(&scope, node, move || ItemData { .. })?;
//!     }));
//!     collection.slot(&scope, container.peek()?)?;
//! });
//!
//! // later, in an event handler
//! let items = collection.use_collection(&scope)?.get();
//! ```
//!
//! Registration order is irrelevant: [`ItemsGetter::get`] sorts by the
//! nodes' position in the document. Mutations bump a version signal, so a
//! getter read inside an effect re-runs when items come and go.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{effect, effect_scope, signal, untrack, Signal};

use super::context::{create_scoped_context_factory, CreateScope, Scope, ScopedContext};
use super::owner::owned;
use super::types::{noop_cleanup, Cleanup};
use crate::engine::arrays::attributes;
use crate::engine::{compare_document_position, contains, is_allocated, is_connected, on_destroy};
use crate::error::{PrimitiveError, Result};
use crate::state::is_server;

/// Attribute marking collection item nodes.
pub const ITEM_ATTRIBUTE: &str = "data-collection-item";

// =============================================================================
// Registry
// =============================================================================

/// A registered item: its node and its metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionItem<T> {
    pub node: usize,
    pub data: T,
}

struct CollectionState<T> {
    container: Cell<Option<usize>>,
    items: RefCell<Vec<CollectionItem<T>>>,
    version: Signal<u64>,
}

impl<T: Clone + 'static> CollectionState<T> {
    fn new() -> Self {
        Self {
            container: Cell::new(None),
            items: RefCell::new(Vec::new()),
            version: signal(0),
        }
    }

    fn bump(&self) {
        let next = untrack(|| self.version.get()) + 1;
        self.version.set(next);
    }

    fn upsert(&self, node: usize, data: T) {
        {
            let mut items = self.items.borrow_mut();
            match items.iter_mut().find(|item| item.node == node) {
                Some(item) => item.data = data,
                None => items.push(CollectionItem { node, data }),
            }
        }
        self.bump();
    }

    fn remove(&self, node: usize) {
        let removed = {
            let mut items = self.items.borrow_mut();
            let before = items.len();
            items.retain(|item| item.node != node);
            items.len() != before
        };
        if removed {
            self.bump();
        }
    }

    fn sorted(&self) -> Vec<CollectionItem<T>> {
        let container = self.container.get();
        let mut items: Vec<CollectionItem<T>> = self
            .items
            .borrow()
            .iter()
            .filter(|item| is_connected(item.node))
            .filter(|item| container.is_none_or(|c| contains(c, item.node)))
            .cloned()
            .collect();
        items.sort_by(|a, b| compare_document_position(a.node, b.node));
        items
    }
}

// =============================================================================
// Items Getter
// =============================================================================

/// Reads the collection in document order.
pub struct ItemsGetter<T: Clone + 'static> {
    state: Option<Rc<CollectionState<T>>>,
}

impl<T: Clone + 'static> Clone for ItemsGetter<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Clone + 'static> ItemsGetter<T> {
    /// Snapshot of the mounted items, sorted by document position. Tracked.
    pub fn get(&self) -> Vec<CollectionItem<T>> {
        match &self.state {
            Some(state) => {
                state.version.get();
                state.sorted()
            }
            None => Vec::new(),
        }
    }
}

// =============================================================================
// Collection
// =============================================================================

/// A collection family created by [`create_collection`].
pub struct Collection<T: Clone + 'static> {
    name: String,
    context: ScopedContext<CollectionState<T>>,
}

impl<T: Clone + 'static> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            context: self.context.clone(),
        }
    }
}

/// Create a collection family named `name`.
pub fn create_collection<T: Clone + 'static>(name: &str) -> (Collection<T>, CreateScope) {
    let provider_name = format!("{name}CollectionProvider");
    let (factory, create_scope) = create_scoped_context_factory(&provider_name, vec![]);
    let context = factory.create_context::<CollectionState<T>>(&provider_name, None);
    (
        Collection {
            name: name.to_string(),
            context,
        },
        create_scope,
    )
}

impl<T: Clone + 'static> Collection<T> {
    /// Own a registry for everything `children` renders.
    pub fn provider(&self, scope: &Scope, children: impl FnOnce()) -> Cleanup {
        self.context.provide(scope, CollectionState::new(), children)
    }

    /// Register the container node; items outside it are not returned.
    pub fn slot(&self, scope: &Scope, node: usize) -> Result<Cleanup> {
        let consumer = format!("{}CollectionSlot", self.name);
        let state = match self.context.use_context(&consumer, scope) {
            Ok(state) => state,
            Err(_) if is_server() => return Ok(noop_cleanup()),
            Err(err) => return Err(err),
        };
        state.container.set(Some(node));
        state.bump();
        Ok(owned(Box::new(move || {
            if state.container.get() == Some(node) {
                state.container.set(None);
                state.bump();
            }
        })))
    }

    /// Register an item node. `data` is re-read whenever its signals change.
    ///
    /// The entry leaves the registry on cleanup or when the node is released,
    /// whichever happens first.
    pub fn item(&self, scope: &Scope, node: usize, data: impl Fn() -> T + 'static) -> Result<Cleanup> {
        let consumer = format!("{}CollectionItemSlot", self.name);
        let state = match self.context.use_context(&consumer, scope) {
            Ok(state) => state,
            Err(_) if is_server() => return Ok(noop_cleanup()),
            Err(err) => return Err(err),
        };
        if !is_allocated(node) {
            return Err(PrimitiveError::DetachedNode { node });
        }

        attributes::set_attribute(node, ITEM_ATTRIBUTE, "");

        let effect_state = state.clone();
        let scope_handle = effect_scope(false);
        scope_handle.run(move || {
            let _stop = effect(move || {
                let value = data();
                untrack(|| effect_state.upsert(node, value));
            });
        });

        let destroy_state = Rc::downgrade(&state);
        on_destroy(node, move || {
            if let Some(state) = destroy_state.upgrade() {
                state.remove(node);
            }
        });

        Ok(owned(Box::new(move || {
            scope_handle.stop();
            state.remove(node);
        })))
    }

    /// A getter over the nearest registry.
    ///
    /// Without a provider this is an error on the client and an empty
    /// getter when rendering without a document.
    pub fn use_collection(&self, scope: &Scope) -> Result<ItemsGetter<T>> {
        let consumer = format!("{}CollectionConsumer", self.name);
        match self.context.use_context(&consumer, scope) {
            Ok(state) => Ok(ItemsGetter { state: Some(state) }),
            Err(_) if is_server() => Ok(ItemsGetter { state: None }),
            Err(err) => Err(err),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{append_child, body, create_detached_node, create_node, insert_before, release_index, with_parent};
    use crate::state::set_environment;
    use crate::types::Environment;

    fn setup() {
        crate::reset_all();
    }

    type Getter = Rc<RefCell<Option<ItemsGetter<&'static str>>>>;

    #[test]
    fn test_items_in_document_order_not_registration_order() {
        setup();

        let (collection, _) = create_collection::<&'static str>("List");
        let scope = Scope::default();
        let getter: Getter = Rc::default();
        let getter_clone = getter.clone();
        let collection_inner = collection.clone();

        let _cleanup = collection.provider(&scope, move || {
            let container = create_node("ul", None);
            let (a, b, c) = with_parent(container, || {
                (create_node("li", None), create_node("li", None), create_node("li", None))
            });
            let scope = Scope::default();
            collection_inner.slot(&scope, container).unwrap();
            // Register out of order.
            collection_inner.item(&scope, c, || "c").unwrap();
            collection_inner.item(&scope, a, || "a").unwrap();
            collection_inner.item(&scope, b, || "b").unwrap();
            *getter_clone.borrow_mut() = Some(collection_inner.use_collection(&scope).unwrap());
        });

        let getter = getter.borrow().clone().unwrap();
        let data: Vec<_> = getter.get().into_iter().map(|item| item.data).collect();
        assert_eq!(data, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_reordering_nodes_reorders_items() {
        setup();

        let (collection, _) = create_collection::<&'static str>("List");
        let getter: Getter = Rc::default();
        let getter_clone = getter.clone();
        let nodes = Rc::new(RefCell::new(Vec::new()));
        let nodes_clone = nodes.clone();
        let collection_inner = collection.clone();

        let _cleanup = collection.provider(&Scope::default(), move || {
            let scope = Scope::default();
            let container = create_node("ul", None);
            let a = with_parent(container, || create_node("li", None));
            let b = with_parent(container, || create_node("li", None));
            collection_inner.item(&scope, a, || "a").unwrap();
            collection_inner.item(&scope, b, || "b").unwrap();
            nodes_clone.borrow_mut().extend([container, a, b]);
            *getter_clone.borrow_mut() = Some(collection_inner.use_collection(&scope).unwrap());
        });

        let (container, a, b) = {
            let n = nodes.borrow();
            (n[0], n[1], n[2])
        };
        let getter = getter.borrow().clone().unwrap();
        insert_before(container, b, Some(a));
        let data: Vec<_> = getter.get().into_iter().map(|item| item.data).collect();
        assert_eq!(data, vec!["b", "a"]);

        release_index(a);
        let data: Vec<_> = getter.get().into_iter().map(|item| item.data).collect();
        assert_eq!(data, vec!["b"]);
    }

    #[test]
    fn test_reactive_metadata_and_version() {
        setup();

        let (collection, _) = create_collection::<bool>("Flags");
        let flag = signal(true);
        let flag_read = flag.clone();
        let observed = Rc::new(RefCell::new(Vec::new()));
        let observed_clone = observed.clone();
        let collection_inner = collection.clone();

        let _cleanup = collection.provider(&Scope::default(), move || {
            let scope = Scope::default();
            let node = create_node("div", None);
            collection_inner.item(&scope, node, move || flag_read.get()).unwrap();
            let getter = collection_inner.use_collection(&scope).unwrap();
            let _stop = effect(move || {
                let flags: Vec<bool> = getter.get().into_iter().map(|i| i.data).collect();
                observed_clone.borrow_mut().push(flags);
            });
        });

        flag.set(false);
        assert_eq!(observed.borrow().last(), Some(&vec![false]));
    }

    #[test]
    fn test_item_cleanup_unregisters() {
        setup();

        let (collection, _) = create_collection::<u8>("List");
        let getter: Rc<RefCell<Option<ItemsGetter<u8>>>> = Rc::default();
        let getter_clone = getter.clone();
        let item_cleanup: Rc<RefCell<Option<Cleanup>>> = Rc::default();
        let item_cleanup_clone = item_cleanup.clone();
        let collection_inner = collection.clone();

        let _cleanup = collection.provider(&Scope::default(), move || {
            let scope = Scope::default();
            let node = create_node("div", None);
            *item_cleanup_clone.borrow_mut() = Some(collection_inner.item(&scope, node, || 1).unwrap());
            *getter_clone.borrow_mut() = Some(collection_inner.use_collection(&scope).unwrap());
        });

        let getter = getter.borrow().clone().unwrap();
        assert_eq!(getter.get().len(), 1);
        let cleanup = item_cleanup.borrow_mut().take().unwrap();
        cleanup();
        assert!(getter.get().is_empty());
    }

    #[test]
    fn test_missing_provider() {
        setup();

        let (collection, _) = create_collection::<u8>("Menu");
        let err = collection.use_collection(&Scope::default()).err().unwrap();
        assert_eq!(
            err,
            PrimitiveError::MissingProvider {
                consumer: "MenuCollectionConsumer".into(),
                provider: "MenuCollectionProvider".into(),
            }
        );

        set_environment(Environment::Server);
        let getter = collection.use_collection(&Scope::default()).unwrap();
        assert!(getter.get().is_empty());
        let node = create_node("div", None);
        assert!(collection.item(&Scope::default(), node, || 0).is_ok());
    }

    #[test]
    fn test_released_node_cannot_register() {
        setup();

        let (collection, _) = create_collection::<u8>("Menu");
        let node = create_node("div", None);
        release_index(node);

        let result = Rc::new(RefCell::new(None));
        let result_inner = result.clone();
        let provider_collection = collection.clone();
        let _cleanup = collection.provider(&Scope::default(), move || {
            *result_inner.borrow_mut() = Some(provider_collection.item(&Scope::default(), node, || 1).err());
        });
        assert_eq!(result.borrow_mut().take().flatten(), Some(PrimitiveError::DetachedNode { node }));
    }

    #[test]
    fn test_detached_items_are_not_members() {
        setup();

        let (collection, _) = create_collection::<&'static str>("List");
        let getter: Getter = Rc::default();
        let getter_clone = getter.clone();
        let collection_inner = collection.clone();
        let a = create_node("li", None);
        let c = create_node("li", None);
        let loose = create_detached_node("li");

        let _cleanup = collection.provider(&Scope::default(), move || {
            let scope = Scope::default();
            collection_inner.item(&scope, loose, || "loose").unwrap();
            collection_inner.item(&scope, c, || "c").unwrap();
            collection_inner.item(&scope, a, || "a").unwrap();
            *getter_clone.borrow_mut() = Some(collection_inner.use_collection(&scope).unwrap());
        });
        let getter = getter.borrow().clone().unwrap();
        let data = |g: &ItemsGetter<&'static str>| g.get().into_iter().map(|item| item.data).collect::<Vec<_>>();
        assert_eq!(data(&getter), vec!["a", "c"]);

        // Attaching it makes it a member at its document position.
        insert_before(body(), loose, Some(c));
        assert_eq!(data(&getter), vec!["a", "loose", "c"]);

        append_child(create_detached_node("div"), loose);
        assert_eq!(data(&getter), vec!["a", "c"]);
    }
}
