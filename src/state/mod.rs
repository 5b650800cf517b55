//! State Module - host interaction state
//!
//! The runtime state the primitives observe and drive:
//!
//! - **Focus** - focused node signal, focus events, tabbable queries, Tab navigation
//! - **Keyboard** - key event types, `key_down` driver with default actions
//! - **Pointer** - hit resolution, `pointer_down` / `click` drivers
//! - **Animation** - computed animation name, animation event drivers
//! - **Input** - crossterm bridge and hit grid
//! - **Environment** - client vs. server rendering

pub mod animation;
pub mod environment;
pub mod focus;
pub mod input;
pub mod keyboard;
pub mod pointer;

pub use environment::{environment, is_server, set_environment};
pub use focus::{active_element, blur, focus, focused_node};
pub use keyboard::{key_down, KeyboardEvent, Modifiers};
pub use pointer::{click, pointer_down};
