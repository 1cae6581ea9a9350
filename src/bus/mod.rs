//! Event bus - fan-out of controller events to SSE clients and the CLI watcher

use std::sync::Arc;
use tokio::sync::broadcast;

pub use led_wire::LedEvent;

const BUS_CAPACITY: usize = 128;

pub struct EventBus {
    tx: broadcast::Sender<LedEvent>,
}

pub type SharedBus = Arc<EventBus>;

pub fn create_bus() -> SharedBus {
    Arc::new(EventBus::new())
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: LedEvent) {
        tracing::trace!(event_type = event.event_type(), "bus publish");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
