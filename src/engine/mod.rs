//! Headless document engine - node registry, parallel arrays, events, tasks.
//!
//! The engine is the host the primitives run against:
//! - Registry: index allocation, tree links, parent context, document order
//! - Arrays: parallel per-node state (tag, attributes, tab index, style)
//! - Events: capture/target/bubble dispatch with cancelable events
//! - Scheduler: microtask queue and zero-delay timers on a virtual clock
//! - Observer: subtree removal records delivered as microtasks
//!
//! # Architecture
//!
//! Nodes are NOT objects. They are indices into parallel arrays:
//!
//! ```text
//! Index 0: html   (parent=None)
//! Index 1: body   (parent=0)
//! Index 2: div    (parent=1, data-state="open", tab_index=None)
//! Index 3: button (parent=2, tab_index=Some(0))
//! ```
//!
//! Indices are never recycled, so a deferred callback holding an index can
//! never observe a different node under it.

mod registry;
pub mod arrays;
pub mod events;
pub mod observer;
pub mod scheduler;

pub use registry::*;
