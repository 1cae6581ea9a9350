//! SSE wire protocol events.
//!
//! `LedEvent` is what the controller publishes on its bus and what
//! crosses the wire on `/events`.

use serde::{Deserialize, Serialize};

use crate::screen::ScreenSnapshot;
use crate::state::Command;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum LedEvent {
    /// Any of the screen flags changed
    ViewChanged(ScreenSnapshot),

    /// A command was written to the command path
    CommandSent {
        command: Command,
    },

    /// Writing a command failed; displayed state is unchanged
    CommandFailed {
        command: Command,
        error: String,
    },

    /// The state subscription failed and will not be retried
    SubscriptionFailed {
        message: String,
    },
}

impl LedEvent {
    /// Get the event type as a string (for logging/filtering)
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ViewChanged(_) => "view_changed",
            Self::CommandSent { .. } => "command_sent",
            Self::CommandFailed { .. } => "command_failed",
            Self::SubscriptionFailed { .. } => "subscription_failed",
        }
    }

    pub fn is_command_event(&self) -> bool {
        matches!(self, Self::CommandSent { .. } | Self::CommandFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::ScreenView;
    use crate::state::LedState;

    #[test]
    fn test_view_changed_serialization() {
        let event = LedEvent::ViewChanged(ScreenSnapshot {
            view: ScreenView::Ready {
                led_state: LedState::Off,
            },
            led_state: LedState::Off,
            loading: false,
            error: None,
            command_in_flight: false,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"ViewChanged""#));
        assert!(json.contains(r#""led_state":"off""#));

        let deserialized: LedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deserialized);
    }

    #[test]
    fn test_event_type_methods() {
        let sent = LedEvent::CommandSent {
            command: Command::On,
        };
        assert_eq!(sent.event_type(), "command_sent");
        assert!(sent.is_command_event());

        let failed = LedEvent::SubscriptionFailed {
            message: "denied".to_string(),
        };
        assert_eq!(failed.event_type(), "subscription_failed");
        assert!(!failed.is_command_event());
    }

    #[test]
    fn test_command_failed_payload_shape() {
        let event = LedEvent::CommandFailed {
            command: Command::Off,
            error: "timeout".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CommandFailed");
        assert_eq!(json["payload"]["command"], "off");
        assert_eq!(json["payload"]["error"], "timeout");
    }
}
