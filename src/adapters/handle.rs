//! SubscriptionHandle - Scoped ownership of one running subscription

use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::adapters::path::StorePath;

/// SubscriptionHandle owns the task consuming a subscription stream:
/// - `unmount()` cancels it and waits until the stream has been dropped
/// - Dropping the handle cancels it without waiting
///
/// The consumer future owns the stream, so cancelling the task is what
/// releases the subscription at the store.
pub struct SubscriptionHandle {
    path: StorePath,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Run `consumer` until it completes or the handle is released
    pub fn spawn<F>(path: StorePath, consumer: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let task_path = path.clone();

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = consumer => {
                    debug!(path = %task_path, "Subscription consumer finished");
                }
                _ = token.cancelled() => {
                    debug!(path = %task_path, "Subscription cancelled");
                }
            }
        });

        Self {
            path,
            shutdown,
            task: Some(task),
        }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// True while the consumer task is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel and wait for the consumer (and its stream) to be dropped
    pub async fn unmount(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        info!(path = %self.path, "Subscription released");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
