//! Transient notification banner.

use dioxus::prelude::*;
use led_wire::{Notice, NoticeKind};

#[derive(Props, Clone, PartialEq)]
pub struct NoticeBannerProps {
    pub notice: Notice,
}

/// Shown once after a command; the close link (and the next refresh) drops it.
#[component]
pub fn NoticeBanner(props: NoticeBannerProps) -> Element {
    let class = match props.notice.kind {
        NoticeKind::Success => "notice success",
        NoticeKind::Error => "notice error",
    };

    rsx! {
        div { class: "{class}", role: "alert",
            a { href: "/", aria_label: "Dismiss", "×" }
            strong { "{props.notice.title}" }
            p { style: "margin:0;", "{props.notice.message}" }
        }
    }
}
