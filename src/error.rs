//! Error types for store adapters and the screen controller

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a [`RealtimeStore`](crate::adapters::RealtimeStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be set up (missing or malformed database URL, etc.)
    #[error("store configuration error: {0}")]
    Config(String),

    #[error("invalid store path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response; `message` is the server's `error` field when present
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    /// No response headers within the request timeout
    #[error("store did not respond within {0:?}")]
    Timeout(Duration),

    #[error("malformed store payload: {0}")]
    Decode(String),

    /// The server cancelled the subscription (security rules no longer allow the read)
    #[error("subscription cancelled by server: {0}")]
    Cancelled(String),

    #[error("credential expired or revoked")]
    AuthRevoked,

    #[error("subscription stream closed")]
    Closed,

    /// Injected failure from the in-memory store
    #[error("{0}")]
    Rejected(String),
}

impl StoreError {
    /// True when the failure comes from configuration rather than the network or rules
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidPath { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("LED state subscription is already mounted")]
    AlreadyMounted,
}
