//! Input Module - crossterm bridge
//!
//! Converts crossterm terminal events into the kernel's key and pointer
//! drivers. Mouse coordinates are mapped to nodes through a `HitGrid`
//! that the host fills from its own layout.
//!
//! # API
//!
//! - `convert_key_event` - crossterm KeyEvent to our KeyboardEvent
//! - `convert_event` - crossterm Event to our InputEvent
//! - `poll_event` / `read_event` - terminal event polling
//! - `route_event` - drive `key_down` / `pointer_down` / `click`
//! - `fill_hit_rect` / `hit_test` - cell-to-node map
//!
//! # Example
//!
//! ```ignore
//! use spark_primitives::state::input::{poll_event, route_event};
//! use std::time::Duration;
//!
//! loop {
//!     if let Ok(Some(event)) = poll_event(Duration::from_millis(16)) {
//!         route_event(event);
//!     }
//! }
//! ```

use std::cell::{Cell, RefCell};
use std::time::Duration;

use crossterm::event::{
    poll, read, Event as CrosstermEvent, KeyCode, KeyEvent as CrosstermKeyEvent, KeyEventKind,
    KeyModifiers, MouseButton as CrosstermMouseButton, MouseEvent as CrosstermMouseEvent,
    MouseEventKind,
};

use super::keyboard::{self, KeyState, KeyboardEvent, Modifiers};
use super::pointer;
use crate::types::PointerType;

// =============================================================================
// INPUT EVENT ENUM
// =============================================================================

/// Unified event type for the kernel
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Primary button pressed at a cell
    PointerDown { x: u16, y: u16 },
    /// Primary button released at a cell
    PointerUp { x: u16, y: u16 },
    /// Keyboard event
    Key(KeyboardEvent),
    /// Terminal resize (new width, height)
    Resize(u16, u16),
    /// Anything the kernel does not react to
    None,
}

// =============================================================================
// HIT GRID - O(1) Coordinate to Node Lookup
// =============================================================================

/// A grid mapping terminal cells to node indices.
pub struct HitGrid {
    width: u16,
    height: u16,
    cells: Vec<Option<usize>>,
}

impl HitGrid {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    /// Resize the grid, clearing all contents.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.cells = vec![None; width as usize * height as usize];
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// Fill a rectangle with a node index (clipped to the grid).
    pub fn fill_rect(&mut self, x: u16, y: u16, width: u16, height: u16, index: usize) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for cy in y..y_end {
            for cx in x..x_end {
                let idx = cy as usize * self.width as usize + cx as usize;
                self.cells[idx] = Some(index);
            }
        }
    }

    /// Node at a cell.
    pub fn get(&self, x: u16, y: u16) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get(y as usize * self.width as usize + x as usize)
            .copied()
            .flatten()
    }
}

thread_local! {
    static HIT_GRID: RefCell<HitGrid> = RefCell::new(HitGrid::new(80, 24));
    static PRESSED: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Fill a rectangle in the global hit grid.
pub fn fill_hit_rect(x: u16, y: u16, width: u16, height: u16, index: usize) {
    HIT_GRID.with(|g| g.borrow_mut().fill_rect(x, y, width, height, index));
}

/// Node at a cell in the global hit grid.
pub fn hit_test(x: u16, y: u16) -> Option<usize> {
    HIT_GRID.with(|g| g.borrow().get(x, y))
}

/// Clear the global hit grid.
pub fn clear_hit_grid() {
    HIT_GRID.with(|g| g.borrow_mut().clear());
}

// =============================================================================
// CONVERSION
// =============================================================================

/// Convert crossterm KeyModifiers to our Modifiers
fn convert_modifiers(mods: KeyModifiers) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::CTRL, mods.contains(KeyModifiers::CONTROL));
    modifiers.set(Modifiers::ALT, mods.contains(KeyModifiers::ALT));
    modifiers.set(Modifiers::SHIFT, mods.contains(KeyModifiers::SHIFT));
    modifiers.set(
        Modifiers::META,
        mods.intersects(KeyModifiers::SUPER | KeyModifiers::META),
    );
    modifiers
}

/// Convert crossterm KeyEvent to our KeyboardEvent (web key values)
pub fn convert_key_event(event: CrosstermKeyEvent) -> KeyboardEvent {
    let mut modifiers = convert_modifiers(event.modifiers);
    let key = match event.code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => {
            modifiers |= Modifiers::SHIFT;
            "Tab".to_string()
        }
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Esc => "Escape".to_string(),
        KeyCode::Up => "ArrowUp".to_string(),
        KeyCode::Down => "ArrowDown".to_string(),
        KeyCode::Left => "ArrowLeft".to_string(),
        KeyCode::Right => "ArrowRight".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        _ => String::new(),
    };

    let state = match event.kind {
        KeyEventKind::Press => KeyState::Press,
        KeyEventKind::Repeat => KeyState::Repeat,
        KeyEventKind::Release => KeyState::Release,
    };

    KeyboardEvent { key, modifiers, state }
}

fn convert_mouse_event(event: CrosstermMouseEvent) -> InputEvent {
    match event.kind {
        MouseEventKind::Down(CrosstermMouseButton::Left) => InputEvent::PointerDown {
            x: event.column,
            y: event.row,
        },
        MouseEventKind::Up(CrosstermMouseButton::Left) => InputEvent::PointerUp {
            x: event.column,
            y: event.row,
        },
        _ => InputEvent::None,
    }
}

/// Convert a crossterm event.
pub fn convert_event(event: CrosstermEvent) -> InputEvent {
    match event {
        CrosstermEvent::Key(key) => InputEvent::Key(convert_key_event(key)),
        CrosstermEvent::Mouse(mouse) => convert_mouse_event(mouse),
        CrosstermEvent::Resize(w, h) => InputEvent::Resize(w, h),
        _ => InputEvent::None,
    }
}

// =============================================================================
// EVENT POLLING
// =============================================================================

/// Poll for an event with timeout. Returns None if no event within timeout.
pub fn poll_event(timeout: Duration) -> std::io::Result<Option<InputEvent>> {
    if poll(timeout)? {
        Ok(Some(read_event()?))
    } else {
        Ok(None)
    }
}

/// Read the next event (blocking).
pub fn read_event() -> std::io::Result<InputEvent> {
    Ok(convert_event(read()?))
}

// =============================================================================
// EVENT ROUTING
// =============================================================================

/// Drive the kernel with an input event.
///
/// A release on the node that received the press produces a click.
/// Returns false when the dispatched event had its default prevented.
pub fn route_event(event: InputEvent) -> bool {
    match event {
        InputEvent::Key(key) => keyboard::key_down(key),
        InputEvent::PointerDown { x, y } => {
            let Some(node) = hit_test(x, y) else {
                return true;
            };
            PRESSED.with(|pressed| pressed.set(Some(node)));
            pointer::pointer_down(node, PointerType::Mouse)
        }
        InputEvent::PointerUp { x, y } => {
            let pressed = PRESSED.with(|pressed| pressed.take());
            match (pressed, hit_test(x, y)) {
                (Some(down), Some(up)) if down == up => pointer::click(up),
                _ => true,
            }
        }
        InputEvent::Resize(w, h) => {
            HIT_GRID.with(|g| g.borrow_mut().resize(w, h));
            true
        }
        InputEvent::None => true,
    }
}

/// Reset input state (for testing).
pub fn reset_input_state() {
    HIT_GRID.with(|g| *g.borrow_mut() = HitGrid::new(80, 24));
    PRESSED.with(|pressed| pressed.set(None));
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::create_node;
    use crate::engine::events::{add_event_listener, EventKind, ListenerOptions};
    use crate::state::focus;
    use crossterm::event::KeyEventState;
    use std::rc::Rc;

    fn setup() {
        crate::reset_all();
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> CrosstermKeyEvent {
        CrosstermKeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_convert_key_special() {
        assert_eq!(convert_key_event(key(KeyCode::Enter, KeyModifiers::empty())).key, "Enter");
        assert_eq!(convert_key_event(key(KeyCode::Esc, KeyModifiers::empty())).key, "Escape");
        assert_eq!(convert_key_event(key(KeyCode::Char(' '), KeyModifiers::empty())).key, " ");
    }

    #[test]
    fn test_convert_key_all_arrows() {
        let arrows = [
            (KeyCode::Up, "ArrowUp"),
            (KeyCode::Down, "ArrowDown"),
            (KeyCode::Left, "ArrowLeft"),
            (KeyCode::Right, "ArrowRight"),
            (KeyCode::Home, "Home"),
            (KeyCode::End, "End"),
            (KeyCode::PageUp, "PageUp"),
            (KeyCode::PageDown, "PageDown"),
        ];
        for (code, expected) in arrows {
            assert_eq!(convert_key_event(key(code, KeyModifiers::empty())).key, expected);
        }
    }

    #[test]
    fn test_convert_backtab_is_shift_tab() {
        let event = convert_key_event(key(KeyCode::BackTab, KeyModifiers::empty()));
        assert_eq!(event.key, "Tab");
        assert!(event.shift());
    }

    #[test]
    fn test_convert_modifiers() {
        let event = convert_key_event(key(
            KeyCode::Char('a'),
            KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
        ));
        assert_eq!(event.modifiers, Modifiers::CTRL | Modifiers::ALT | Modifiers::META);
    }

    #[test]
    fn test_hit_grid() {
        let mut grid = HitGrid::new(10, 5);
        grid.fill_rect(2, 1, 3, 2, 7);
        assert_eq!(grid.get(2, 1), Some(7));
        assert_eq!(grid.get(4, 2), Some(7));
        assert_eq!(grid.get(5, 2), None);
        assert_eq!(grid.get(20, 20), None);

        // Clipped at the edge.
        grid.fill_rect(8, 4, 5, 5, 9);
        assert_eq!(grid.get(9, 4), Some(9));
    }

    #[test]
    fn test_route_press_release_clicks() {
        setup();

        let button = create_node("button", None);
        fill_hit_rect(0, 0, 4, 1, button);
        let clicks = Rc::new(Cell::new(0));
        let clicks_clone = clicks.clone();
        add_event_listener(button, EventKind::Click, ListenerOptions::default(), move |_| {
            clicks_clone.set(clicks_clone.get() + 1);
        });

        route_event(InputEvent::PointerDown { x: 1, y: 0 });
        assert_eq!(focus::focused_node(), Some(button));
        route_event(InputEvent::PointerUp { x: 2, y: 0 });
        assert_eq!(clicks.get(), 1);

        // Released somewhere else: no click.
        route_event(InputEvent::PointerDown { x: 1, y: 0 });
        route_event(InputEvent::PointerUp { x: 9, y: 9 });
        assert_eq!(clicks.get(), 1);
    }
}
