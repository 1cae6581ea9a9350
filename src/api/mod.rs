//! HTTP API handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Redirect, Response,
    },
    routing::{get, post},
    Form, Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use led_wire::{Command, Notice, NoticeKind, ScreenSnapshot};

use crate::screen::LedController;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<LedController>,
    pub started: Instant,
}

impl AppState {
    pub fn new(controller: Arc<LedController>) -> Self {
        Self {
            controller,
            started: Instant::now(),
        }
    }
}

/// Build the router with all routes and layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(screen_handler))
        .route("/ui/command", post(ui_command_handler))
        .route("/status", get(status_handler))
        .route("/led", get(led_handler))
        .route("/led/command", post(command_handler))
        .route("/events", get(events_handler))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// General status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub store: String,
    pub mounted: bool,
    pub bus_subscribers: usize,
}

/// GET /status - Service health check
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
        store: state.controller.store_name().to_string(),
        mounted: state.controller.is_mounted().await,
        bus_subscribers: state.controller.bus().subscriber_count(),
    })
}

/// GET /led - Current screen state
pub async fn led_handler(State(state): State<AppState>) -> Json<ScreenSnapshot> {
    Json(state.controller.snapshot().await)
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

/// POST /led/command - Write a command; 502 when the store rejects it
pub async fn command_handler(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Response {
    let command: Command = match request.command.parse() {
        Ok(command) => command,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(Notice::command_failed(e))).into_response();
        }
    };

    let notice = state.controller.send_command(command).await;
    let status = match notice.kind {
        NoticeKind::Success => StatusCode::OK,
        NoticeKind::Error => StatusCode::BAD_GATEWAY,
    };
    (status, Json(notice)).into_response()
}

/// GET /events - SSE stream of controller events
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.controller.bus().subscribe();
    // Lagged receivers skip missed events; the next ViewChanged carries full state
    let stream = BroadcastStream::new(rx).filter_map(|event| {
        let event = event.ok()?;
        let data = serde_json::to_string(&event).ok()?;
        Some(Ok(Event::default().data(data)))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Notice carried through the redirect after a form post
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
    pub title: Option<String>,
    pub kind: Option<NoticeKind>,
}

impl NoticeQuery {
    fn from_notice(notice: &Notice) -> String {
        let kind = match notice.kind {
            NoticeKind::Success => "success",
            NoticeKind::Error => "error",
        };
        format!(
            "/?kind={}&title={}&notice={}",
            kind,
            urlencoding::encode(&notice.title),
            urlencoding::encode(&notice.message)
        )
    }

    fn into_notice(self) -> Option<Notice> {
        Some(Notice {
            message: self.notice?,
            title: self.title.unwrap_or_default(),
            kind: self.kind.unwrap_or(NoticeKind::Success),
        })
    }
}

/// GET / - The control screen
pub async fn screen_handler(
    State(state): State<AppState>,
    Query(query): Query<NoticeQuery>,
) -> Html<String> {
    let snapshot = state.controller.snapshot().await;
    Html(crate::app::render_screen(snapshot, query.into_notice()))
}

#[derive(Debug, Deserialize)]
pub struct CommandForm {
    pub command: String,
}

/// POST /ui/command - Form variant of /led/command that redirects back to the screen
pub async fn ui_command_handler(
    State(state): State<AppState>,
    Form(form): Form<CommandForm>,
) -> Redirect {
    let notice = match form.command.parse::<Command>() {
        Ok(command) => state.controller.send_command(command).await,
        Err(e) => Notice::command_failed(e),
    };
    Redirect::to(&NoticeQuery::from_notice(&notice))
}
