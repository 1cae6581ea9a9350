//! In-process store
//!
//! Backs the `memory` backend (offline runs without a Firebase project)
//! and the test suites. Optionally emulates the device by mirroring each
//! command write into the state path.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::debug;

use crate::adapters::path::{LedPaths, StorePath};
use crate::adapters::traits::{RealtimeStore, ValueStream};
use crate::error::StoreError;

const CHANGE_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
enum Change {
    Value(StorePath, Option<Value>),
    /// Terminates every open subscription with an error
    Broken(String),
}

struct Inner {
    values: RwLock<HashMap<StorePath, Value>>,
    changes: broadcast::Sender<Change>,
    active: AtomicUsize,
    write_failure: RwLock<Option<String>>,
    subscribe_failure: RwLock<Option<String>>,
    device_echo: Option<LedPaths>,
}

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::build(None)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that answers every command write by reporting it on the state path
    pub fn with_device_echo(paths: LedPaths) -> Self {
        Self::build(Some(paths))
    }

    fn build(device_echo: Option<LedPaths>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                values: RwLock::new(HashMap::new()),
                changes,
                active: AtomicUsize::new(0),
                write_failure: RwLock::new(None),
                subscribe_failure: RwLock::new(None),
                device_echo,
            }),
        }
    }

    pub async fn get(&self, path: &StorePath) -> Option<Value> {
        self.inner.values.read().await.get(path).cloned()
    }

    /// Number of subscription streams currently alive
    pub fn active_subscriptions(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail with `message` (`None` restores writes)
    pub async fn fail_writes(&self, message: Option<&str>) {
        *self.inner.write_failure.write().await = message.map(str::to_string);
    }

    /// Make subsequent subscribe calls fail with `message`
    pub async fn fail_subscriptions(&self, message: Option<&str>) {
        *self.inner.subscribe_failure.write().await = message.map(str::to_string);
    }

    /// Terminate every open subscription with an error
    pub fn break_subscriptions(&self, message: &str) {
        let _ = self.inner.changes.send(Change::Broken(message.to_string()));
    }

    async fn store_value(&self, path: &StorePath, value: Value) {
        let stored = if value.is_null() {
            self.inner.values.write().await.remove(path);
            None
        } else {
            self.inner
                .values
                .write()
                .await
                .insert(path.clone(), value.clone());
            Some(value)
        };
        let _ = self.inner.changes.send(Change::Value(path.clone(), stored));
    }
}

/// Counts a live subscription for as long as its stream exists
struct ActiveGuard {
    inner: Arc<Inner>,
}

impl ActiveGuard {
    fn new(inner: Arc<Inner>) -> Self {
        inner.active.fetch_add(1, Ordering::SeqCst);
        Self { inner }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
    }
}

struct SubscriptionState {
    rx: broadcast::Receiver<Change>,
    guard: ActiveGuard,
    path: StorePath,
    pending: Option<Option<Value>>,
    done: bool,
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn subscribe(&self, path: &StorePath) -> Result<ValueStream, StoreError> {
        if let Some(message) = self.inner.subscribe_failure.read().await.clone() {
            return Err(StoreError::Rejected(message));
        }

        // Subscribe before reading so no change is lost in between
        let rx = self.inner.changes.subscribe();
        let current = self.get(path).await;
        debug!(%path, "Memory subscription opened");

        let state = SubscriptionState {
            rx,
            guard: ActiveGuard::new(self.inner.clone()),
            path: path.clone(),
            pending: Some(current),
            done: false,
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            if state.done {
                return None;
            }
            if let Some(value) = state.pending.take() {
                return Some((Ok(value), state));
            }
            loop {
                match state.rx.recv().await {
                    Ok(Change::Value(changed, value)) if changed == state.path => {
                        return Some((Ok(value), state));
                    }
                    Ok(Change::Value(..)) => continue,
                    Ok(Change::Broken(message)) => {
                        state.done = true;
                        return Some((Err(StoreError::Rejected(message)), state));
                    }
                    Err(RecvError::Lagged(_)) => {
                        let value = state.guard.inner.values.read().await.get(&state.path).cloned();
                        return Some((Ok(value), state));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream.boxed())
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        if let Some(message) = self.inner.write_failure.read().await.clone() {
            return Err(StoreError::Rejected(message));
        }

        self.store_value(path, value.clone()).await;

        if let Some(paths) = &self.inner.device_echo {
            if &paths.command == path {
                debug!(%value, "Emulated device applying command");
                self.store_value(&paths.state, value).await;
            }
        }
        Ok(())
    }
}
