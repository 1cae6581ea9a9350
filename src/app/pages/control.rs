//! LED control screen.
//!
//! One of three views: loading, error, or the normal view with the current
//! state and the two command buttons.

use dioxus::prelude::*;
use led_wire::{Command, Notice, ScreenSnapshot, ScreenView};

use crate::app::components::{Layout, NoticeBanner};

#[derive(Props, Clone, PartialEq)]
pub struct ControlScreenProps {
    pub snapshot: ScreenSnapshot,
    #[props(!optional)]
    pub notice: Option<Notice>,
}

#[derive(Props, Clone, PartialEq)]
struct CommandButtonProps {
    command: Command,
    label: String,
    class: String,
}

/// Form posting a single command; works without JavaScript.
#[component]
fn CommandButton(props: CommandButtonProps) -> Element {
    rsx! {
        form { method: "post", action: "/ui/command",
            input { r#type: "hidden", name: "command", value: "{props.command}" }
            button { r#type: "submit", class: "{props.class}", "{props.label}" }
        }
    }
}

#[component]
pub fn ControlScreen(props: ControlScreenProps) -> Element {
    let view = props.snapshot.view.clone();

    let content = match &view {
        ScreenView::Loading => rsx! {
            article { aria_busy: "true", "Loading LED state..." }
        },
        ScreenView::Error { message } => rsx! {
            p { class: "status-err", "Error: {message}" }
            p { "Please check your Firebase configuration and network." }
        },
        ScreenView::Ready { led_state } => {
            let label = led_state.display_label();
            let state_class = if led_state.is_on() { "led-state on" } else { "led-state" };
            rsx! {
                h1 { "ESP32 LED Control" }
                p { class: "{state_class}", "Current LED State: {label}" }
                div { class: "controls",
                    CommandButton { command: Command::On, label: "Turn LED ON".to_string(), class: "led-on".to_string() }
                    CommandButton { command: Command::Off, label: "Turn LED OFF".to_string(), class: "led-off".to_string() }
                }
                p { class: "hint", "(Ensure your ESP32 is running and connected to Firebase)" }
            }
        }
    };

    rsx! {
        Layout {
            view: view.name().to_string(),
            led_state: props.snapshot.led_state.to_string(),
            if let Some(notice) = props.notice.clone() {
                NoticeBanner { notice }
            }
            {content}
        }
    }
}
