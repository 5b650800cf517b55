//! Presence - keeps content mounted until its exit animation has finished.
//!
//! # State machine
//!
//! ```text
//!            present = true
//!   Unmounted ───────────────▶ Mounted
//!       ▲                        │ present = false (checked one microtask later)
//!       │                        ▼
//!       │     exit animation?  ──no──▶ Unmounted
//!       │            │ yes
//!       │            ▼
//!       └─ end/cancel ◀── Unmounting ──present = true──▶ Mounted
//! ```
//!
//! An exit animation is "in flight" when the registered node's computed
//! animation name differs from the one recorded while it was mounted (the
//! closed state selected a new animation). Only the end or cancel of *that*
//! animation, on *that* node, finishes the exit.
//!
//! At most one node is observed per presence; the latest
//! [`PresenceHandle::register_node`] wins. Nested components reach the
//! handle through [`use_presence`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{effect, effect_scope, signal, untrack, EffectScope, Signal};

use super::context::{create_context, Context};
use super::control_flow::show;
use super::owner::owned;
use super::types::Cleanup;
use crate::engine::arrays::style;
use crate::engine::events::{listen, Event, EventKind, ListenerOptions};
use crate::engine::scheduler::{queue_microtask, set_timeout};
use crate::state::animation::{computed_animation_name, is_display_none, NO_ANIMATION};
use crate::types::PresenceStatus;

// =============================================================================
// Handle
// =============================================================================

struct PresenceInner {
    present: Rc<dyn Fn() -> bool>,
    status: Signal<PresenceStatus>,
    node: Cell<Option<usize>>,
    prev_animation_name: RefCell<String>,
    /// Bumped on every `present` change; stale deferred checks compare it.
    generation: Cell<u64>,
    start_listener: RefCell<Option<Cleanup>>,
    exit_listeners: RefCell<Vec<Cleanup>>,
    scope: RefCell<Option<EffectScope>>,
}

/// Live presence state for one piece of content.
#[derive(Clone)]
pub struct PresenceHandle(Rc<PresenceInner>);

impl PresenceHandle {
    /// Whether the content should be in the tree (mounted or animating out). Tracked.
    pub fn is_present(&self) -> bool {
        self.0.status.get() != PresenceStatus::Unmounted
    }

    /// Tracked.
    pub fn status(&self) -> PresenceStatus {
        self.0.status.get()
    }

    /// The node whose animations are observed.
    pub fn node(&self) -> Option<usize> {
        self.0.node.get()
    }

    /// Observe `node` (replacing any previous one), or stop observing.
    pub fn register_node(&self, node: Option<usize>) {
        let inner = &self.0;
        if let Some(cleanup) = inner.start_listener.borrow_mut().take() {
            cleanup();
        }
        inner.node.set(node);

        match node {
            Some(node) => {
                if untrack(|| inner.status.get()) == PresenceStatus::Mounted {
                    *inner.prev_animation_name.borrow_mut() = computed_animation_name(node);
                }
                let weak = Rc::downgrade(&self.0);
                let cleanup = listen(node, EventKind::AnimationStart, ListenerOptions::default(), move |event: &Event| {
                    let Some(inner) = weak.upgrade() else { return };
                    if event.target_node() == Some(node) {
                        *inner.prev_animation_name.borrow_mut() = computed_animation_name(node);
                    }
                });
                *inner.start_listener.borrow_mut() = Some(cleanup);
            }
            None => {
                if untrack(|| inner.status.get()) == PresenceStatus::Unmounting {
                    self.finish_exit();
                }
            }
        }
    }

    fn set_status(&self, status: PresenceStatus) {
        let inner = &self.0;
        if untrack(|| inner.status.get()) == status {
            return;
        }
        log::debug!("presence {:?} -> {:?}", untrack(|| inner.status.get()), status);
        *inner.prev_animation_name.borrow_mut() = match (status, inner.node.get()) {
            (PresenceStatus::Mounted, Some(node)) => computed_animation_name(node),
            _ => NO_ANIMATION.to_string(),
        };
        inner.status.set(status);
    }

    fn clear_exit_listeners(&self) {
        let listeners = std::mem::take(&mut *self.0.exit_listeners.borrow_mut());
        for cleanup in listeners {
            cleanup();
        }
    }

    fn on_present_changed(&self, present: bool) {
        let inner = &self.0;
        inner.generation.set(inner.generation.get() + 1);

        if present {
            self.clear_exit_listeners();
            self.set_status(PresenceStatus::Mounted);
            return;
        }

        // Let state-dependent styles (data-state="closed") land first.
        let generation = inner.generation.get();
        let weak = Rc::downgrade(&self.0);
        queue_microtask(move || {
            let Some(inner) = weak.upgrade() else { return };
            if inner.generation.get() != generation || (inner.present)() {
                return;
            }
            PresenceHandle(inner).begin_exit();
        });
    }

    fn begin_exit(&self) {
        let inner = &self.0;
        let Some(node) = inner.node.get() else {
            self.set_status(PresenceStatus::Unmounted);
            return;
        };

        let current = computed_animation_name(node);
        if current == NO_ANIMATION || is_display_none(node) {
            self.set_status(PresenceStatus::Unmounted);
            return;
        }

        let previous = inner.prev_animation_name.borrow().clone();
        if current == previous {
            self.set_status(PresenceStatus::Unmounted);
            return;
        }

        self.set_status(PresenceStatus::Unmounting);
        self.clear_exit_listeners();
        for kind in [EventKind::AnimationEnd, EventKind::AnimationCancel] {
            let weak = Rc::downgrade(&self.0);
            let exit_animation = current.clone();
            let cleanup = listen(node, kind, ListenerOptions::default(), move |event: &Event| {
                let Some(inner) = weak.upgrade() else { return };
                if event.target_node() != Some(node) || event.animation_name() != Some(exit_animation.as_str()) {
                    return;
                }
                PresenceHandle(inner).finish_exit();
            });
            inner.exit_listeners.borrow_mut().push(cleanup);
        }
    }

    fn finish_exit(&self) {
        self.clear_exit_listeners();
        if let Some(node) = self.0.node.get() {
            freeze_final_frame(node);
        }
        self.set_status(PresenceStatus::Unmounted);
    }

    fn dispose(&self) {
        let inner = &self.0;
        inner.generation.set(inner.generation.get() + 1);
        self.clear_exit_listeners();
        if let Some(cleanup) = inner.start_listener.borrow_mut().take() {
            cleanup();
        }
        if let Some(scope) = inner.scope.borrow_mut().take() {
            scope.stop();
        }
    }
}

/// Hold the last animation frame for one macrotask while the node goes away.
fn freeze_final_frame(node: usize) {
    let original = style::get_animation_fill_mode(node);
    style::set_animation_fill_mode(node, Some("forwards"));
    set_timeout(
        move || {
            if style::get_animation_fill_mode(node).as_deref() == Some("forwards") {
                style::set_animation_fill_mode(node, original.as_deref());
            }
        },
        0,
    );
}

/// Track `present` and the registered node's animations.
///
/// The returned handle keeps tracking until [`presence`] (or the caller)
/// disposes it with [`dispose_presence`].
pub fn create_presence(present: impl Fn() -> bool + 'static) -> PresenceHandle {
    let present: Rc<dyn Fn() -> bool> = Rc::new(present);
    let initial = untrack(|| present());
    let handle = PresenceHandle(Rc::new(PresenceInner {
        present: present.clone(),
        status: signal(if initial {
            PresenceStatus::Mounted
        } else {
            PresenceStatus::Unmounted
        }),
        node: Cell::new(None),
        prev_animation_name: RefCell::new(NO_ANIMATION.to_string()),
        generation: Cell::new(0),
        start_listener: RefCell::new(None),
        exit_listeners: RefCell::new(Vec::new()),
        scope: RefCell::new(None),
    }));

    let scope = effect_scope(false);
    let weak = Rc::downgrade(&handle.0);
    let last = Cell::new(initial);
    scope.run(move || {
        let _stop = effect(move || {
            let now = present();
            if now == last.get() {
                return;
            }
            last.set(now);
            if let Some(inner) = weak.upgrade() {
                untrack(|| PresenceHandle(inner).on_present_changed(now));
            }
        });
    });
    *handle.0.scope.borrow_mut() = Some(scope);
    handle
}

/// Stop tracking and drop pending listeners.
pub fn dispose_presence(handle: &PresenceHandle) {
    handle.dispose();
}

// =============================================================================
// Component
// =============================================================================

thread_local! {
    static PRESENCE_CONTEXT: Context<PresenceHandle> = create_context("Presence");
}

/// Properties for [`presence`].
pub struct PresenceProps {
    pub present: Rc<dyn Fn() -> bool>,
    /// Render regardless of `present` (animation control handed to the caller).
    pub force_mount: bool,
    pub children: Rc<dyn Fn(&PresenceHandle) -> Cleanup>,
}

impl Default for PresenceProps {
    fn default() -> Self {
        Self {
            present: Rc::new(|| true),
            force_mount: false,
            children: Rc::new(|_| Box::new(|| {})),
        }
    }
}

/// Render `children` while present, keeping them through exit animations.
pub fn presence(props: PresenceProps) -> Cleanup {
    let PresenceProps {
        present,
        force_mount,
        children,
    } = props;
    let handle = create_presence(move || present());
    let context = PRESENCE_CONTEXT.with(|c| *c);

    let handle_for_condition = handle.clone();
    let handle_for_render = handle.clone();
    let content = show(
        move || force_mount || handle_for_condition.is_present(),
        move || {
            let handle = handle_for_render.clone();
            let children = children.clone();
            context.provide(handle.clone(), move || {
                let cleanup = children(&handle);
                super::owner::on_cleanup(cleanup);
            })
        },
        None::<fn() -> Cleanup>,
    );

    owned(Box::new(move || {
        content();
        handle.dispose();
    }))
}

/// The nearest enclosing presence, for nested components that own the
/// animated node.
pub fn use_presence() -> Option<PresenceHandle> {
    PRESENCE_CONTEXT
        .with(|c| *c)
        .use_context()
        .map(|handle| (*handle).clone())
}

// =============================================================================
// TESTS
// =============================================================================
