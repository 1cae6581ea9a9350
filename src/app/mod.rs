//! Server-side rendered control screen.
//!
//! The screen is rendered with Dioxus SSR on every request; a small script
//! listens on `/events` and reloads the page when the view changes.

use dioxus::prelude::*;
use led_wire::{Notice, ScreenSnapshot};

pub mod components;
pub mod pages;

use components::CUSTOM_STYLES;
use pages::{ControlScreen, ControlScreenProps};

/// Reload when the published view differs from the one on screen.
const REFRESH_SCRIPT: &str = r#"
const root = document.getElementById('led-screen');
const es = new EventSource('/events');
es.onmessage = (e) => {
    try {
        const event = JSON.parse(e.data);
        if (event.type !== 'ViewChanged') return;
        const view = event.payload.view;
        const led = event.payload.led_state || '';
        if (view.view !== root.dataset.view || (view.view === 'ready' && led !== root.dataset.led)) {
            window.location.replace('/');
        }
    } catch (err) {
        console.error('Bad LED event', err);
    }
};
"#;

/// Render the full HTML document for the current screen
pub fn render_screen(snapshot: ScreenSnapshot, notice: Option<Notice>) -> String {
    let mut vdom = VirtualDom::new_with_props(ControlScreen, ControlScreenProps { snapshot, notice });
    vdom.rebuild_in_place();
    let body = dioxus_ssr::render(&vdom);

    format!(
        r#"<!DOCTYPE html>
<html lang="en" data-theme="light">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>ESP32 LED Control</title>
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/@picocss/pico@2/css/pico.min.css">
<style>{CUSTOM_STYLES}</style>
</head>
<body>
{body}
<script>{REFRESH_SCRIPT}</script>
</body>
</html>"#
    )
}
