//! Controllable State - one value, owned by the caller or by the component.
//!
//! A [`ControllableSignal`] reads the caller's `prop` when it yields a value
//! (controlled) and an internal signal otherwise (uncontrolled). Every write
//! goes through one setter:
//!
//! - no-op writes (`next == current`) change nothing and notify nobody
//! - controlled: only `on_change(next)` fires
//! - uncontrolled: the internal signal updates and `on_change(next)` fires,
//!   inside one batch
//!
//! Switching between modes during a component's lifetime is a usage error.
//! It is logged once per switch and otherwise tolerated.
//!
//! # Example
//!
//! ```ignore
//! let open = create_controllable_signal(ControllableProps {
//!     prop: None,
//!     default_prop: false,
//!     on_change: Some(Rc::new(|open| println!("open = {open}"))),
//! });
//!
//! open.set(true);
//! open.update(|open| !open);
//! ```

use std::cell::Cell;
use std::rc::Rc;

use spark_signals::{batch, signal, untrack, Signal};

use super::types::{ChangeCallback, MaybeControlled};

/// Inputs of [`create_controllable_signal`].
pub struct ControllableProps<T> {
    /// Caller-owned value. Yields `None` while uncontrolled.
    pub prop: Option<MaybeControlled<T>>,
    /// Initial internal value. Read once.
    pub default_prop: T,
    pub on_change: Option<ChangeCallback<T>>,
}

impl<T: Default> Default for ControllableProps<T> {
    fn default() -> Self {
        Self {
            prop: None,
            default_prop: T::default(),
            on_change: None,
        }
    }
}

/// A value that is either controlled by the caller or owned internally.
pub struct ControllableSignal<T: Clone + PartialEq + 'static> {
    prop: Option<MaybeControlled<T>>,
    internal: Signal<T>,
    on_change: Option<ChangeCallback<T>>,
    was_controlled: Rc<Cell<Option<bool>>>,
}

impl<T: Clone + PartialEq + 'static> Clone for ControllableSignal<T> {
    fn clone(&self) -> Self {
        Self {
            prop: self.prop.clone(),
            internal: self.internal.clone(),
            on_change: self.on_change.clone(),
            was_controlled: self.was_controlled.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> ControllableSignal<T> {
    fn external(&self) -> Option<T> {
        let value = self.prop.as_ref().and_then(|prop| prop());
        self.note_mode(value.is_some());
        value
    }

    fn note_mode(&self, controlled: bool) {
        match self.was_controlled.replace(Some(controlled)) {
            Some(previous) if previous != controlled => {
                let (from, to) = if controlled {
                    ("uncontrolled", "controlled")
                } else {
                    ("controlled", "uncontrolled")
                };
                log::warn!(
                    "A component is changing from {from} to {to}. Decide between using a \
                     controlled or uncontrolled value for the lifetime of the component."
                );
            }
            _ => {}
        }
    }

    /// Current value (tracked).
    pub fn get(&self) -> T {
        match self.external() {
            Some(value) => value,
            None => self.internal.get(),
        }
    }

    /// Whether the caller currently owns the value.
    pub fn is_controlled(&self) -> bool {
        untrack(|| self.external()).is_some()
    }

    /// Write a value.
    pub fn set(&self, next: T) {
        self.update(move |_| next);
    }

    /// Write a value computed from the current one. The current value is
    /// read untracked.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let (current, controlled) = untrack(|| match self.external() {
            Some(value) => (value, true),
            None => (self.internal.get(), false),
        });
        let next = f(&current);
        if next == current {
            return;
        }

        if controlled {
            if let Some(on_change) = &self.on_change {
                on_change(next);
            }
        } else {
            batch(|| {
                self.internal.set(next.clone());
                if let Some(on_change) = &self.on_change {
                    on_change(next);
                }
            });
        }
    }
}

/// Create a controllable signal.
pub fn create_controllable_signal<T: Clone + PartialEq + 'static>(
    props: ControllableProps<T>,
) -> ControllableSignal<T> {
    let ControllableProps {
        prop,
        default_prop,
        on_change,
    } = props;
    ControllableSignal {
        prop,
        internal: signal(default_prop),
        on_change,
        was_controlled: Rc::new(Cell::new(None)),
    }
}

/// Controllable `bool` (default `false`).
pub fn create_controllable_boolean_signal(
    prop: Option<MaybeControlled<bool>>,
    default_prop: Option<bool>,
    on_change: Option<ChangeCallback<bool>>,
) -> ControllableSignal<bool> {
    create_controllable_signal(ControllableProps {
        prop,
        default_prop: default_prop.unwrap_or(false),
        on_change,
    })
}

/// Controllable list (default empty).
pub fn create_controllable_array_signal<T: Clone + PartialEq + 'static>(
    prop: Option<MaybeControlled<Vec<T>>>,
    default_prop: Option<Vec<T>>,
    on_change: Option<ChangeCallback<Vec<T>>>,
) -> ControllableSignal<Vec<T>> {
    create_controllable_signal(ControllableProps {
        prop,
        default_prop: default_prop.unwrap_or_default(),
        on_change,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use spark_signals::effect;
    use std::cell::RefCell;

    fn setup() {
        crate::reset_all();
    }

    fn recorder<T: Clone + 'static>() -> (ChangeCallback<T>, Rc<RefCell<Vec<T>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let calls_clone = calls.clone();
        (Rc::new(move |v: T| calls_clone.borrow_mut().push(v)), calls)
    }

    #[test]
    fn test_uncontrolled_writes() {
        setup();

        let (on_change, calls) = recorder::<i32>();
        let value = create_controllable_signal(ControllableProps {
            prop: None,
            default_prop: 1,
            on_change: Some(on_change),
        });

        assert_eq!(value.get(), 1);
        value.set(2);
        value.set(2);
        value.update(|v| v + 3);
        value.update(|v| *v);

        assert_eq!(value.get(), 5);
        assert_eq!(*calls.borrow(), vec![2, 5]);
        assert!(!value.is_controlled());
    }

    #[test]
    fn test_controlled_only_notifies() {
        setup();

        let external = signal(Some(10));
        let external_read = external.clone();
        let (on_change, calls) = recorder::<i32>();
        let value = create_controllable_signal(ControllableProps {
            prop: Some(Rc::new(move || external_read.get())),
            default_prop: 0,
            on_change: Some(on_change),
        });

        assert!(value.is_controlled());
        value.set(11);
        assert_eq!(value.get(), 10, "controlled value only changes from outside");
        assert_eq!(*calls.borrow(), vec![11]);

        external.set(Some(11));
        assert_eq!(value.get(), 11);
        value.set(11);
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_uncontrolled_write_is_atomic() {
        setup();

        let seen_in_callback = Rc::new(Cell::new(None));
        let value_slot: Rc<RefCell<Option<ControllableSignal<i32>>>> = Rc::new(RefCell::new(None));
        let value_slot_cb = value_slot.clone();
        let seen = seen_in_callback.clone();

        let value = create_controllable_signal(ControllableProps {
            prop: None,
            default_prop: 0,
            on_change: Some(Rc::new(move |next: i32| {
                let current = value_slot_cb
                    .borrow()
                    .as_ref()
                    .map(|v| untrack(|| v.get()));
                seen.set(current.map(|c| c == next));
            })),
        });
        *value_slot.borrow_mut() = Some(value.clone());

        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let value_for_effect = value.clone();
        let _stop = effect(move || {
            value_for_effect.get();
            runs_clone.set(runs_clone.get() + 1);
        });

        value.set(7);
        assert_eq!(seen_in_callback.get(), Some(true));
        assert_eq!(runs.get(), 2, "one notification for value + callback");
    }

    #[test]
    fn test_mode_switch_is_tolerated() {
        setup();

        let external = signal(None::<bool>);
        let external_read = external.clone();
        let value = create_controllable_boolean_signal(
            Some(Rc::new(move || external_read.get())),
            None,
            None,
        );

        assert!(!value.get());
        external.set(Some(true));
        assert!(value.get());
        external.set(None);
        assert!(!value.get());
    }

    #[test]
    fn test_array_default() {
        setup();

        let value = create_controllable_array_signal::<String>(None, None, None);
        assert!(value.get().is_empty());
        value.update(|v| {
            let mut next = v.clone();
            next.push("a".into());
            next
        });
        assert_eq!(value.get(), vec!["a".to_string()]);
    }
}
