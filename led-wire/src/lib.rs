//! Shared wire protocol types for the LED remote control surface.
//!
//! These types cross the boundary between the controller (which mirrors
//! the remote store) and its consumers: the HTML screen, the JSON API,
//! SSE clients and the CLI watcher.
//!
//! # Modules
//! - [`state`] - LED state tags and commands
//! - [`screen`] - Screen views, snapshots and transient notices
//! - [`events`] - SSE wire protocol events (LedEvent)

pub mod events;
pub mod screen;
pub mod state;

// Re-export commonly used types at crate root
pub use events::LedEvent;
pub use screen::{Notice, NoticeKind, ScreenSnapshot, ScreenView};
pub use state::{Command, LedState, UnknownCommand};
