//! Screen views, snapshots and transient notices.

use serde::{Deserialize, Serialize};

use crate::state::{Command, LedState};

/// The three mutually exclusive screen views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ScreenView {
    /// Waiting for the first value or for a command write to finish
    Loading,
    /// The subscription failed; terminal until remounted
    Error { message: String },
    /// Normal view with the last known LED state
    Ready { led_state: LedState },
}

impl ScreenView {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Error { .. } => "error",
            Self::Ready { .. } => "ready",
        }
    }
}

/// Full screen state as exposed over the API.
///
/// `view` is derived from the three flags; the flags are carried as well
/// so clients can tell a command in flight from an initial load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSnapshot {
    pub view: ScreenView,
    pub led_state: LedState,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(default)]
    pub command_in_flight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
}

/// Transient notification shown after a command write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn command_sent(command: Command) -> Self {
        Self {
            kind: NoticeKind::Success,
            title: "Command Sent".to_string(),
            message: format!("LED command '{}' sent successfully.", command),
        }
    }

    pub fn command_failed(error: impl std::fmt::Display) -> Self {
        Self {
            kind: NoticeKind::Error,
            title: "Error".to_string(),
            message: format!("Failed to send command: {}", error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NoticeKind::Success
    }
}
