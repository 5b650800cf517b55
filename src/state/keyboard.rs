//! Keyboard Module - key event types and the `keydown` host driver
//!
//! `key_down` is what the host calls for every key press. It dispatches a
//! bubbling, cancelable `KeyDown` event at the focused node (or body) and,
//! unless a handler prevented it, performs the default action:
//!
//! - `Tab` / `Shift+Tab` - sequential focus navigation
//! - `Enter` / `Space` on a `button` - click
//!
//! # API
//!
//! - `key_down(event)` - Dispatch a key press
//! - `last_event` - Get last keyboard event
//! - `last_key` - Get last key pressed
//!
//! # Example
//!
//! ```ignore
//! use spark_primitives::state::keyboard::{self, KeyboardEvent, Modifiers};
//!
//! keyboard::key_down(KeyboardEvent::new("ArrowRight"));
//! keyboard::key_down(KeyboardEvent::with_modifiers("Tab", Modifiers::SHIFT));
//! ```

use spark_signals::{signal, Signal};

use super::{focus, pointer};
use crate::engine::arrays::core;
use crate::engine::events::{dispatch_event, Event, EventDetail, EventKind};
use crate::engine::scheduler;

// =============================================================================
// TYPES
// =============================================================================

bitflags::bitflags! {
    /// Keyboard modifiers held during a key press.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
        const META  = 1 << 3;
    }
}

/// Key event state (press, repeat, release)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Press,
    Repeat,
    Release,
}

/// Keyboard event
#[derive(Clone, Debug, PartialEq)]
pub struct KeyboardEvent {
    /// The key value (e.g., "a", " ", "Enter", "ArrowUp", "Escape")
    pub key: String,
    /// Modifier keys state
    pub modifiers: Modifiers,
    /// Press/repeat/release state
    pub state: KeyState,
}

impl KeyboardEvent {
    /// Create a simple key press event
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::empty(),
            state: KeyState::Press,
        }
    }

    /// Create a key press with modifiers
    pub fn with_modifiers(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            state: KeyState::Press,
        }
    }

    /// Check if this is a press event
    pub fn is_press(&self) -> bool {
        self.state == KeyState::Press
    }

    /// Any of meta/ctrl/alt/shift held.
    pub fn has_modifier(&self) -> bool {
        !self.modifiers.is_empty()
    }

    pub fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }
}

// =============================================================================
// STATE
// =============================================================================

thread_local! {
    static LAST_EVENT: Signal<Option<KeyboardEvent>> = signal(None);
}

/// Get the last keyboard event
pub fn last_event() -> Option<KeyboardEvent> {
    LAST_EVENT.with(|s| s.get())
}

/// Get the last key pressed
pub fn last_key() -> String {
    last_event().map(|e| e.key).unwrap_or_default()
}

// =============================================================================
// HOST DRIVER
// =============================================================================

/// Dispatch a key press at the focused node and run its default action.
///
/// Release events only update `last_event`. Returns false when a handler
/// prevented the default action.
pub fn key_down(event: KeyboardEvent) -> bool {
    LAST_EVENT.with(|s| s.set(Some(event.clone())));
    if event.state == KeyState::Release {
        return true;
    }

    let target = focus::active_element();
    let dom_event = Event::new(EventKind::KeyDown, target).with_detail(EventDetail::Key(event.clone()));
    let not_prevented = dispatch_event(&dom_event);

    if not_prevented {
        match event.key.as_str() {
            "Tab" if !event.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::META) => {
                focus::focus_next_tabbable(event.shift());
            }
            "Enter" | " " if core::get_tag(target) == "button" => {
                pointer::click(target);
            }
            _ => {}
        }
    }

    scheduler::run_microtasks();
    not_prevented
}

/// Reset keyboard state (for testing)
pub fn reset_keyboard_state() {
    LAST_EVENT.with(|s| s.set(None));
}

// =============================================================================
// TESTS
// =============================================================================
