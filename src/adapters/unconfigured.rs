//! Stand-in store for a backend that could not be built
//!
//! Lets the screen start and show its setup-failed view instead of the
//! process exiting on a bad database URL.

use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::path::StorePath;
use crate::adapters::traits::{RealtimeStore, ValueStream};
use crate::error::StoreError;

pub struct UnconfiguredStore {
    reason: String,
}

impl UnconfiguredStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[async_trait]
impl RealtimeStore for UnconfiguredStore {
    fn name(&self) -> &'static str {
        "unconfigured"
    }

    async fn subscribe(&self, _path: &StorePath) -> Result<ValueStream, StoreError> {
        Err(StoreError::Config(self.reason.clone()))
    }

    async fn set(&self, _path: &StorePath, _value: Value) -> Result<(), StoreError> {
        Err(StoreError::Config(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_operation_is_a_setup_error() {
        let store = UnconfiguredStore::new("store.database_url is required");
        let path = StorePath::new("led/state").unwrap();

        let Err(err) = store.subscribe(&path).await else {
            panic!("subscribe should fail");
        };
        assert!(err.is_setup());
        assert!(err.to_string().contains("store.database_url is required"));

        let err = store.set(&path, Value::from("on")).await.unwrap_err();
        assert!(err.is_setup());
    }
}
