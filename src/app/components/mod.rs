//! Shared UI components for the server-rendered screen.

pub mod layout;
pub mod notice;

pub use layout::{Layout, CUSTOM_STYLES};
pub use notice::NoticeBanner;
