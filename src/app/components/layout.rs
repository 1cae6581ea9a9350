//! Layout component wrapping the screen with Pico CSS and common elements.

use dioxus::prelude::*;

/// CSS styles for the screen (extends Pico CSS).
pub const CUSTOM_STYLES: &str = r#"
:root { --pico-font-size: 16px; }
main.container { max-width: 32rem; text-align: center; }
.status-ok { color: var(--pico-ins-color); }
.status-err { color: var(--pico-del-color); }
.led-state { font-size: 1.4rem; margin-bottom: 2rem; }
.led-state.on { color: #4CAF50; }
.controls { display: flex; gap: 1.25rem; justify-content: center; margin-bottom: 1.25rem; }
.controls form { margin: 0; }
.controls button { margin: 0; padding: 0.6rem 1.2rem; }
button.led-on { background: #4CAF50; border-color: #4CAF50; }
button.led-off { background: #F44336; border-color: #F44336; }
.notice { padding: 0.75rem 1rem; border-radius: var(--pico-border-radius); margin-bottom: 1.5rem; text-align: left; }
.notice.success { border: 1px solid var(--pico-ins-color); }
.notice.error { border: 1px solid var(--pico-del-color); }
.notice a { float: right; text-decoration: none; }
.hint { font-size: 0.8rem; color: var(--pico-muted-color); margin-top: 1.25rem; }
small { color: var(--pico-muted-color); }
"#;

#[derive(Props, Clone, PartialEq)]
pub struct LayoutProps {
    /// Name of the view being rendered (`loading`, `error`, `ready`)
    pub view: String,
    /// Verbatim LED state, used by the refresh script to detect changes
    #[props(default)]
    pub led_state: String,
    /// Page content
    pub children: Element,
}

/// Main layout component wrapping the screen.
#[component]
pub fn Layout(props: LayoutProps) -> Element {
    let version = env!("CARGO_PKG_VERSION");

    rsx! {
        main {
            id: "led-screen",
            class: "container",
            "data-view": "{props.view}",
            "data-led": "{props.led_state}",
            {props.children}
        }
        footer {
            class: "container",
            style: "text-align:center;",
            small { "LED Remote Control v{version}" }
        }
    }
}
