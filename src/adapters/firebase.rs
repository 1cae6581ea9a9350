//! Firebase Realtime Database client
//!
//! Uses the REST API: writes are `PUT {db}/{path}.json`, subscriptions
//! are the same URL requested with `Accept: text/event-stream`.
//! Documentation: https://firebase.google.com/docs/reference/rest/database

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use url::Url;

use crate::adapters::path::StorePath;
use crate::adapters::sse::{SseDecoder, SseFrame};
use crate::adapters::traits::{RealtimeStore, ValueStream};
use crate::error::StoreError;

/// Buffered values per subscription before the reader waits on the consumer
const STREAM_BUFFER: usize = 16;

pub struct FirebaseStore {
    base: Url,
    auth_token: Option<String>,
    client: Client,
    request_timeout: Duration,
}

impl FirebaseStore {
    pub fn new(
        database_url: &str,
        auth_token: Option<String>,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut base = Url::parse(database_url.trim())
            .map_err(|e| StoreError::Config(format!("invalid database URL {database_url:?}: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(StoreError::Config(format!(
                "database URL must be http(s), got {}",
                base.scheme()
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        // No whole-request timeout: it would cut long-lived streams.
        // Writes get a per-request timeout instead.
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            base,
            auth_token: auth_token.filter(|t| !t.is_empty()),
            client,
            request_timeout,
        })
    }

    /// REST endpoint for a path, with the auth query parameter when configured
    pub fn endpoint(&self, path: &StorePath) -> Result<Url, StoreError> {
        let mut url = self
            .base
            .join(&format!("{}.json", path.as_str()))
            .map_err(|e| StoreError::Config(format!("cannot build URL for {path}: {e}")))?;
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }
}

#[async_trait]
impl RealtimeStore for FirebaseStore {
    fn name(&self) -> &'static str {
        "firebase"
    }

    async fn subscribe(&self, path: &StorePath) -> Result<ValueStream, StoreError> {
        let url = self.endpoint(path)?;
        debug!(%path, "Opening Firebase event stream");

        // The stream itself is unbounded; only the handshake is timed
        let open = async {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "text/event-stream")
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(status_error(response).await);
            }
            Ok::<_, StoreError>(response)
        };
        let response = tokio::time::timeout(self.request_timeout, open)
            .await
            .map_err(|_| StoreError::Timeout(self.request_timeout))??;

        info!(%path, "Firebase event stream open");
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(pump_events(response, tx, path.to_string()));

        Ok(ReceiverStream::new(rx).boxed())
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let url = self.endpoint(path)?;
        debug!(%path, %value, "Firebase write");

        let response = self
            .client
            .put(url)
            .timeout(self.request_timeout)
            .json(&value)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}

/// Build a `Status` error, preferring the `{"error": "..."}` body Firebase sends
async fn status_error(response: Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "request failed".to_string());
    StoreError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Read the event stream until it fails or the consumer goes away
async fn pump_events(
    response: Response,
    tx: mpsc::Sender<Result<Option<Value>, StoreError>>,
    path: String,
) {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut tree = RemoteTree::default();

    loop {
        let chunk = tokio::select! {
            _ = tx.closed() => {
                debug!(%path, "Subscriber dropped, closing Firebase stream");
                return;
            }
            chunk = body.next() => chunk,
        };

        let chunk = match chunk {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                warn!(%path, "Firebase stream error: {}", e);
                let _ = tx.send(Err(e.into())).await;
                return;
            }
            None => {
                warn!(%path, "Firebase stream ended");
                let _ = tx.send(Err(StoreError::Closed)).await;
                return;
            }
        };

        let frames = match decoder.push(&chunk) {
            Ok(frames) => frames,
            Err(e) => {
                warn!(%path, "Firebase stream rejected: {}", e);
                let _ = tx.send(Err(StoreError::Decode(e.to_string()))).await;
                return;
            }
        };

        for frame in frames {
            match tree.apply(&frame) {
                Ok(Applied::Changed(value)) => {
                    if tx.send(Ok(value)).await.is_err() {
                        return;
                    }
                }
                Ok(Applied::Ignored) => {}
                Err(e) => {
                    warn!(%path, event = %frame.event, "Firebase stream terminated: {}", e);
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    path: String,
    data: Value,
}

#[derive(Debug, PartialEq)]
enum Applied {
    Changed(Option<Value>),
    Ignored,
}

/// Local copy of the subscribed subtree, rebuilt from put/patch events
#[derive(Debug, Default)]
struct RemoteTree {
    root: Option<Value>,
}

impl RemoteTree {
    fn apply(&mut self, frame: &SseFrame) -> Result<Applied, StoreError> {
        match frame.event.as_str() {
            "put" => {
                let payload: EventPayload = serde_json::from_str(&frame.data)?;
                put_at(&mut self.root, &split_path(&payload.path), payload.data);
                Ok(Applied::Changed(self.root.clone()))
            }
            "patch" => {
                let payload: EventPayload = serde_json::from_str(&frame.data)?;
                let Value::Object(children) = payload.data else {
                    return Err(StoreError::Decode("patch data is not an object".to_string()));
                };
                let base = split_path(&payload.path);
                for (key, value) in children {
                    let mut target = base.clone();
                    target.extend(split_path(&key));
                    put_at(&mut self.root, &target, value);
                }
                Ok(Applied::Changed(self.root.clone()))
            }
            "keep-alive" => Ok(Applied::Ignored),
            "cancel" => {
                let reason = serde_json::from_str::<Value>(&frame.data)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| "permission denied".to_string());
                Err(StoreError::Cancelled(reason))
            }
            "auth_revoked" => Err(StoreError::AuthRevoked),
            other => {
                debug!(event = other, "Ignoring unknown Firebase event");
                Ok(Applied::Ignored)
            }
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Replace the node at `segments`; `null` deletes and prunes empty parents
fn put_at(node: &mut Option<Value>, segments: &[String], data: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = if data.is_null() { None } else { Some(data) };
        return;
    };

    if !matches!(node, Some(Value::Object(_))) {
        if data.is_null() {
            return;
        }
        *node = Some(Value::Object(Map::new()));
    }

    let now_empty = match node {
        Some(Value::Object(map)) => {
            let mut child = map.remove(head);
            put_at(&mut child, rest, data);
            if let Some(child) = child {
                map.insert(head.clone(), child);
            }
            map.is_empty()
        }
        _ => false,
    };
    if now_empty {
        *node = None;
    }
}
