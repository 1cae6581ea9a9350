//! Store adapter trait

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::adapters::path::StorePath;
use crate::error::StoreError;

/// Stream of values observed at one path.
///
/// `Ok(None)` means the path is currently absent. An `Err` is terminal;
/// consumers stop polling after the first one. Dropping the stream
/// releases the underlying subscription.
pub type ValueStream = BoxStream<'static, Result<Option<Value>, StoreError>>;

/// A real-time key-value store addressed by slash-separated paths.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Short backend identifier for logs and `/status`
    fn name(&self) -> &'static str;

    /// Subscribe to value changes at `path`.
    ///
    /// The first item is the value at subscription time.
    async fn subscribe(&self, path: &StorePath) -> Result<ValueStream, StoreError>;

    /// Overwrite the value at `path`.
    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;
}
