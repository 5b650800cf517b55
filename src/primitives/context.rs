//! Scoped Context - dependency injection that tolerates nested instances.
//!
//! A plain [`Context`] is one channel: the nearest provider wins. That
//! breaks when two families share a primitive (a toggle group inside a
//! collapsible, both built on roving focus) or when a consumer needs to
//! reach past a nearer provider of the same family.
//!
//! A scoped family fixes this with positional channels:
//!
//! - [`create_scoped_context_factory`] names a family and lists the
//!   families it composes
//! - each [`ScopedContextFactory::create_context`] call registers one
//!   context and gets the next positional index
//! - [`CreateScope::create`] mints a fresh channel per registered context;
//!   the resulting [`UseScope`] folds those channels into a [`Scope`]
//! - providers and consumers given the same `Scope` bind to the same
//!   channels; without one they fall back to the family's base channel
//!
//! ```ignore
//! let (factory, create_scope) = create_scoped_context_factory("Collapsible", vec![]);
//! let context = factory.create_context::<CollapsibleState>("Collapsible", None);
//!
//! let use_scope = create_scope.create();
//! let scope = use_scope.scope(&Scope::default());
//! context.provide(&scope, state, move || {
//!     let state = context.use_context("CollapsibleTrigger", &scope)?;
//! });
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;

use super::owner::{current_owner, lookup_context, owned, with_owner, ContextId, Owner};
use super::types::Cleanup;
use crate::error::{PrimitiveError, Result};

// =============================================================================
// Provide / Lookup
// =============================================================================

/// Run `children` under a frame providing `value` on `id`.
///
/// The frame is live before `children` runs. The returned cleanup disposes
/// everything `children` created.
fn provide_on(id: ContextId, value: Rc<dyn Any>, children: impl FnOnce()) -> Cleanup {
    let parent = current_owner();
    let owner = Owner::with_frame(parent.as_ref(), id, value);
    with_owner(&owner, children);
    owned(Box::new(move || owner.dispose()))
}

fn read<T: 'static>(id: ContextId) -> Option<Rc<T>> {
    lookup_context(id).and_then(|value| value.downcast::<T>().ok())
}

// =============================================================================
// Plain Context
// =============================================================================

/// A single unscoped channel.
pub struct Context<T> {
    id: ContextId,
    name: &'static str,
    _marker: PhantomData<T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Context<T> {}

/// Create an unscoped context.
pub fn create_context<T: 'static>(name: &'static str) -> Context<T> {
    Context {
        id: ContextId::next(),
        name,
        _marker: PhantomData,
    }
}

impl<T: 'static> Context<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn provide(&self, value: T, children: impl FnOnce()) -> Cleanup {
        self.provide_rc(Rc::new(value), children)
    }

    pub fn provide_rc(&self, value: Rc<T>, children: impl FnOnce()) -> Cleanup {
        provide_on(self.id, value, children)
    }

    /// Nearest provided value, if any.
    pub fn use_context(&self) -> Option<Rc<T>> {
        read(self.id)
    }
}

// =============================================================================
// Scope Token
// =============================================================================

/// Maps a family name to the channels its contexts use.
#[derive(Clone, Default)]
pub struct Scope {
    channels: HashMap<String, Rc<[ContextId]>>,
}

impl Scope {
    /// Channel a family assigned to its `index`-th context.
    fn channel(&self, scope_name: &str, index: usize) -> Option<ContextId> {
        self.channels
            .get(scope_name)
            .and_then(|channels| channels.get(index).copied())
    }

    /// Families present in this scope.
    pub fn families(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.channels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").field("families", &self.families()).finish()
    }
}

/// Produces a [`Scope`] from an optional caller override.
#[derive(Clone)]
pub struct UseScope(Rc<dyn Fn(&Scope) -> Scope>);

impl UseScope {
    /// The caller's override with this family's channels filled in where
    /// the override has none.
    pub fn scope(&self, override_scope: &Scope) -> Scope {
        (self.0)(override_scope)
    }
}

/// Mints fresh channel sets for one family (and the families it composes).
#[derive(Clone)]
pub struct CreateScope {
    scope_name: String,
    make: Rc<dyn Fn() -> UseScope>,
}

impl CreateScope {
    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    pub fn create(&self) -> UseScope {
        (self.make)()
    }
}

// =============================================================================
// Scoped Factory
// =============================================================================

struct FactoryInner {
    scope_name: String,
    base_channels: RefCell<Vec<ContextId>>,
}

/// Registers the contexts of one family.
#[derive(Clone)]
pub struct ScopedContextFactory(Rc<FactoryInner>);

impl ScopedContextFactory {
    pub fn scope_name(&self) -> &str {
        &self.0.scope_name
    }

    /// Register a context. Its index is the number of contexts registered
    /// before it.
    pub fn create_context<T: 'static>(
        &self,
        provider_name: &str,
        default_value: Option<T>,
    ) -> ScopedContext<T> {
        let base = ContextId::next();
        let mut channels = self.0.base_channels.borrow_mut();
        let index = channels.len();
        channels.push(base);
        ScopedContext {
            scope_name: self.0.scope_name.clone(),
            provider_name: provider_name.to_string(),
            index,
            base,
            default_value: default_value.map(Rc::new),
        }
    }
}

/// One context of a scoped family.
pub struct ScopedContext<T> {
    scope_name: String,
    provider_name: String,
    index: usize,
    base: ContextId,
    default_value: Option<Rc<T>>,
}

impl<T> Clone for ScopedContext<T> {
    fn clone(&self) -> Self {
        Self {
            scope_name: self.scope_name.clone(),
            provider_name: self.provider_name.clone(),
            index: self.index,
            base: self.base,
            default_value: self.default_value.clone(),
        }
    }
}

impl<T: 'static> ScopedContext<T> {
    fn channel(&self, scope: &Scope) -> ContextId {
        scope.channel(&self.scope_name, self.index).unwrap_or(self.base)
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Provide `value` to everything `children` renders.
    pub fn provide(&self, scope: &Scope, value: T, children: impl FnOnce()) -> Cleanup {
        self.provide_rc(scope, Rc::new(value), children)
    }

    pub fn provide_rc(&self, scope: &Scope, value: Rc<T>, children: impl FnOnce()) -> Cleanup {
        provide_on(self.channel(scope), value, children)
    }

    /// Nearest value on the channel `scope` designates, else the default.
    pub fn use_context(&self, consumer_name: &str, scope: &Scope) -> Result<Rc<T>> {
        if let Some(value) = read::<T>(self.channel(scope)) {
            return Ok(value);
        }
        if let Some(default_value) = &self.default_value {
            return Ok(default_value.clone());
        }
        Err(PrimitiveError::MissingProvider {
            consumer: consumer_name.to_string(),
            provider: self.provider_name.clone(),
        })
    }

    /// Like `use_context` but `None` instead of an error.
    pub fn try_use_context(&self, scope: &Scope) -> Option<Rc<T>> {
        read::<T>(self.channel(scope)).or_else(|| self.default_value.clone())
    }
}

/// Create a scoped family named `scope_name` that composes `deps`.
pub fn create_scoped_context_factory(
    scope_name: &str,
    deps: Vec<CreateScope>,
) -> (ScopedContextFactory, CreateScope) {
    let factory = ScopedContextFactory(Rc::new(FactoryInner {
        scope_name: scope_name.to_string(),
        base_channels: RefCell::new(Vec::new()),
    }));

    let inner = factory.0.clone();
    let base_scope = CreateScope {
        scope_name: scope_name.to_string(),
        make: Rc::new(move || {
            let name = inner.scope_name.clone();
            let channels: Rc<[ContextId]> = inner
                .base_channels
                .borrow()
                .iter()
                .map(|_| ContextId::next())
                .collect();
            UseScope(Rc::new(move |override_scope: &Scope| {
                let mut scope = override_scope.clone();
                scope
                    .channels
                    .entry(name.clone())
                    .or_insert_with(|| channels.clone());
                scope
            }))
        }),
    };

    let mut scopes = vec![base_scope];
    scopes.extend(deps);
    (factory, compose_context_scopes(scopes))
}

/// Fold several families' scopes into one. The first is the base.
pub fn compose_context_scopes(mut scopes: Vec<CreateScope>) -> CreateScope {
    if scopes.len() == 1 {
        return scopes.remove(0);
    }
    let scope_name = scopes
        .first()
        .map(|s| s.scope_name.clone())
        .unwrap_or_default();
    CreateScope {
        scope_name,
        make: Rc::new(move || {
            let hooks: Vec<UseScope> = scopes.iter().map(CreateScope::create).collect();
            UseScope(Rc::new(move |override_scope: &Scope| {
                let mut merged = Scope::default();
                for hook in &hooks {
                    merged.channels.extend(hook.scope(override_scope).channels);
                }
                merged
            }))
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() {
        crate::reset_all();
    }

    #[test]
    fn test_plain_context_nearest_wins() {
        setup();

        let context = create_context::<i32>("Number");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let _cleanup = context.provide(1, move || {
            seen_clone.borrow_mut().push(context.use_context().map(|v| *v));
            let seen_inner = seen_clone.clone();
            let _inner = context.provide(2, move || {
                seen_inner.borrow_mut().push(context.use_context().map(|v| *v));
            });
        });

        assert_eq!(*seen.borrow(), vec![Some(1), Some(2)]);
        assert!(context.use_context().is_none());
    }

    #[test]
    fn test_missing_provider_names_both() {
        setup();

        let (factory, _) = create_scoped_context_factory("Tabs", vec![]);
        let context = factory.create_context::<i32>("Tabs", None);

        let err = context
            .use_context("TabsTrigger", &Scope::default())
            .err()
            .expect("no provider");
        assert_eq!(err.to_string(), "`TabsTrigger` must be used within `Tabs`");
    }

    #[test]
    fn test_default_value_without_provider() {
        setup();

        let (factory, _) = create_scoped_context_factory("Thing", vec![]);
        let context = factory.create_context("Thing", Some(5_u8));
        assert_eq!(context.use_context("ThingPart", &Scope::default()).map(|v| *v), Ok(5));
    }

    #[test]
    fn test_independent_scopes_do_not_see_each_other() {
        setup();

        let (factory, create_scope) = create_scoped_context_factory("Group", vec![]);
        let context = factory.create_context::<&'static str>("Group", None);

        let scope_a = create_scope.create().scope(&Scope::default());
        let scope_b = create_scope.create().scope(&Scope::default());

        let results = Rc::new(RefCell::new(Vec::new()));
        let results_clone = results.clone();
        let (ctx_a, ctx_b) = (context.clone(), context.clone());
        let (a, b) = (scope_a.clone(), scope_b.clone());

        let _cleanup = context.provide(&scope_a, "a", move || {
            let r = results_clone.clone();
            let b_inner = b.clone();
            let _inner = ctx_a.provide(&b_inner, "b", move || {
                r.borrow_mut().push(ctx_b.use_context("Part", &a).ok().map(|v| *v));
                r.borrow_mut().push(ctx_b.use_context("Part", &b).ok().map(|v| *v));
                r.borrow_mut()
                    .push(ctx_b.use_context("Part", &Scope::default()).ok().map(|v| *v));
            });
        });

        assert_eq!(*results.borrow(), vec![Some("a"), Some("b"), None]);
    }

    #[test]
    fn test_positional_index_binds_contexts() {
        setup();

        let (factory, create_scope) = create_scoped_context_factory("Menu", vec![]);
        let first = factory.create_context::<i32>("Menu", None);
        let second = factory.create_context::<i32>("MenuSub", None);
        let scope = create_scope.create().scope(&Scope::default());

        let seen = Rc::new(RefCell::new(None));
        let seen_clone = seen.clone();
        let (first_c, second_c, scope_c) = (first.clone(), second.clone(), scope.clone());
        let _cleanup = first.provide(&scope, 1, move || {
            *seen_clone.borrow_mut() = Some((
                first_c.use_context("Item", &scope_c).ok().map(|v| *v),
                second_c.use_context("Item", &scope_c).ok().map(|v| *v),
            ));
        });

        assert_eq!(*seen.borrow(), Some((Some(1), None)));
    }

    #[test]
    fn test_composed_scope_satisfies_dependency() {
        setup();

        let (inner_factory, inner_create_scope) = create_scoped_context_factory("Inner", vec![]);
        let inner_context = inner_factory.create_context::<i32>("Inner", None);
        let (_outer_factory, outer_create_scope) =
            create_scoped_context_factory("Outer", vec![inner_create_scope.clone()]);

        let outer_scope = outer_create_scope.create().scope(&Scope::default());
        assert_eq!(outer_scope.families(), vec!["Inner", "Outer"]);

        // The dependency keeps the channels the composite chose.
        let use_inner = inner_create_scope.create();
        let inner_scope = use_inner.scope(&outer_scope);

        let seen = Rc::new(RefCell::new(None));
        let seen_clone = seen.clone();
        let (ctx, consumer_scope) = (inner_context.clone(), inner_scope.clone());
        let _cleanup = inner_context.provide(&outer_scope, 9, move || {
            *seen_clone.borrow_mut() = ctx.use_context("InnerItem", &consumer_scope).ok().map(|v| *v);
        });
        assert_eq!(*seen.borrow(), Some(9));
    }

    #[test]
    fn test_provider_children_see_value() {
        setup();

        let context = create_context::<String>("Lazy");
        let seen = Rc::new(RefCell::new(None));
        let seen_clone = seen.clone();
        let _cleanup = context.provide("ready".to_string(), move || {
            *seen_clone.borrow_mut() = context.use_context().map(|v| (*v).clone());
        });
        assert_eq!(seen.borrow().as_deref(), Some("ready"));
    }
}
