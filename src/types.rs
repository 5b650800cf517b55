//! Shared types used across the engine, host state and primitives.

use std::fmt;

// =============================================================================
// Layout / Reading Direction
// =============================================================================

/// Axis along which a group of items is laid out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Value written to `data-orientation` / `aria-orientation`.
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

/// Text direction. Right-to-left swaps the meaning of the horizontal arrows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Rtl => "rtl",
        }
    }
}

// =============================================================================
// Style Values
// =============================================================================

/// The `pointer-events` style property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PointerEvents {
    #[default]
    Auto,
    None,
}

impl fmt::Display for PointerEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerEvents::Auto => f.write_str("auto"),
            PointerEvents::None => f.write_str("none"),
        }
    }
}

/// Input device behind a pointer event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PointerType {
    #[default]
    Mouse,
    Touch,
    Pen,
}

// =============================================================================
// Keyboard Navigation
// =============================================================================

/// Where a navigation key asks focus to go inside a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FocusIntent {
    First,
    Last,
    Prev,
    Next,
}

// =============================================================================
// Presence
// =============================================================================

/// Mount status of a presence-managed subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PresenceStatus {
    /// Present and rendered.
    Mounted,
    /// No longer present but kept alive until its exit animation ends.
    Unmounting,
    /// Removed.
    Unmounted,
}

// =============================================================================
// Environment
// =============================================================================

/// Where the component tree is being rendered.
///
/// `Server` means no live document: DOM-only effects are skipped and
/// ordering queries degrade to empty results instead of failing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Environment {
    #[default]
    Client,
    Server,
}
