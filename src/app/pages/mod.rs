//! Server-rendered pages.

mod control;

pub use control::{ControlScreen, ControlScreenProps};
