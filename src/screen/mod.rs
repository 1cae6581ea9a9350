//! LED control screen model
//!
//! Mirrors the device's state path into three flags (loading, error,
//! LED state) and writes commands to the command path. The flags map to
//! exactly one [`ScreenView`] at any time.

use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use led_wire::{Command, LedEvent, LedState, Notice, ScreenSnapshot, ScreenView};
use serde_json::Value;

use crate::adapters::{LedPaths, RealtimeStore, SubscriptionHandle, ValueStream};
use crate::bus::SharedBus;
use crate::error::ScreenError;

/// Error view message when the store cannot be set up at all
pub const SETUP_FAILED: &str = "Firebase setup failed. Check configuration.";
/// Error view message when the state subscription fails
pub const LISTEN_FAILED: &str = "Failed to listen for LED state. Check rules/path.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenState {
    pub loading: bool,
    pub error: Option<String>,
    pub led_state: LedState,
    pending_commands: usize,
}

impl Default for ScreenState {
    fn default() -> Self {
        Self {
            loading: true,
            error: None,
            led_state: LedState::Unknown,
            pending_commands: 0,
        }
    }
}

impl ScreenState {
    /// Loading wins over error, error wins over ready
    pub fn view(&self) -> ScreenView {
        if self.loading {
            ScreenView::Loading
        } else if let Some(message) = &self.error {
            ScreenView::Error {
                message: message.clone(),
            }
        } else {
            ScreenView::Ready {
                led_state: self.led_state.clone(),
            }
        }
    }

    pub fn snapshot(&self) -> ScreenSnapshot {
        ScreenSnapshot {
            view: self.view(),
            led_state: self.led_state.clone(),
            loading: self.loading,
            error: self.error.clone(),
            command_in_flight: self.pending_commands > 0,
        }
    }

    fn apply_value(&mut self, value: Option<&Value>) {
        self.led_state = LedState::from_remote(value);
        self.loading = false;
    }

    fn fail_subscription(&mut self, message: &str) {
        self.error = Some(message.to_string());
        self.loading = false;
    }
}

/// Apply `change` and publish the resulting snapshot
async fn update_state(
    state: &RwLock<ScreenState>,
    bus: &SharedBus,
    change: impl FnOnce(&mut ScreenState),
) -> ScreenSnapshot {
    let snapshot = {
        let mut state = state.write().await;
        change(&mut state);
        state.snapshot()
    };
    bus.publish(LedEvent::ViewChanged(snapshot.clone()));
    snapshot
}

async fn fail_subscription(state: &RwLock<ScreenState>, bus: &SharedBus, message: &str) {
    update_state(state, bus, |s| s.fail_subscription(message)).await;
    bus.publish(LedEvent::SubscriptionFailed {
        message: message.to_string(),
    });
}

/// Consume the state subscription until it fails; failures are terminal
async fn consume_state(mut stream: ValueStream, state: Arc<RwLock<ScreenState>>, bus: SharedBus) {
    while let Some(item) = stream.next().await {
        match item {
            Ok(value) => {
                let snapshot = update_state(&state, &bus, |s| s.apply_value(value.as_ref())).await;
                debug!(led_state = %snapshot.led_state, "LED state updated");
            }
            Err(e) => {
                error!("LED state listener error: {}", e);
                fail_subscription(&state, &bus, LISTEN_FAILED).await;
                return;
            }
        }
    }

    warn!("LED state subscription ended");
    fail_subscription(&state, &bus, LISTEN_FAILED).await;
}

/// Subscription bookkeeping; only locked for short synchronous sections
#[derive(Default)]
struct MountSlot {
    handle: Option<SubscriptionHandle>,
    /// A `mount` call is between its checks and storing its handle
    mounting: bool,
    /// Bumped by every `unmount`
    generation: u64,
}

fn lock_slot(slot: &Mutex<MountSlot>) -> MutexGuard<'_, MountSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears `mounting` however the mount future ends, including cancellation
struct MountingGuard<'a>(&'a Mutex<MountSlot>);

impl Drop for MountingGuard<'_> {
    fn drop(&mut self) {
        lock_slot(self.0).mounting = false;
    }
}

pub struct LedController {
    store: Arc<dyn RealtimeStore>,
    paths: LedPaths,
    bus: SharedBus,
    state: Arc<RwLock<ScreenState>>,
    subscription: Mutex<MountSlot>,
}

impl LedController {
    pub fn new(store: Arc<dyn RealtimeStore>, paths: LedPaths, bus: SharedBus) -> Self {
        Self {
            store,
            paths,
            bus,
            state: Arc::new(RwLock::new(ScreenState::default())),
            subscription: Mutex::new(MountSlot::default()),
        }
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn paths(&self) -> &LedPaths {
        &self.paths
    }

    pub fn bus(&self) -> &SharedBus {
        &self.bus
    }

    pub async fn snapshot(&self) -> ScreenSnapshot {
        self.state.read().await.snapshot()
    }

    pub async fn view(&self) -> ScreenView {
        self.state.read().await.view()
    }

    /// True while the state subscription is running
    pub async fn is_mounted(&self) -> bool {
        lock_slot(&self.subscription)
            .handle
            .as_ref()
            .is_some_and(|h| h.is_active())
    }

    /// Subscribe to the state path.
    ///
    /// Subscription failures do not fail the mount; they put the screen
    /// into its error view. Mounting again after such a failure starts
    /// from the loading view. An `unmount` that lands while the store is
    /// still opening the subscription wins: the new stream is dropped.
    pub async fn mount(&self) -> Result<(), ScreenError> {
        let (stale, generation) = {
            let mut slot = lock_slot(&self.subscription);
            if slot.mounting || slot.handle.as_ref().is_some_and(|h| h.is_active()) {
                return Err(ScreenError::AlreadyMounted);
            }
            slot.mounting = true;
            (slot.handle.take(), slot.generation)
        };
        let _mounting = MountingGuard(&self.subscription);

        if let Some(handle) = stale {
            handle.unmount().await;
        }

        update_state(&self.state, &self.bus, |s| {
            *s = ScreenState {
                pending_commands: s.pending_commands,
                ..ScreenState::default()
            }
        })
        .await;

        let path = self.paths.state.clone();
        info!(%path, store = self.store.name(), "Subscribing to LED state");

        match self.store.subscribe(&path).await {
            Ok(stream) => {
                let mut slot = lock_slot(&self.subscription);
                if slot.generation != generation {
                    debug!(%path, "Unmounted while subscribing, dropping LED state stream");
                    return Ok(());
                }
                let consumer = consume_state(stream, self.state.clone(), self.bus.clone());
                slot.handle = Some(SubscriptionHandle::spawn(path, consumer));
            }
            Err(e) => {
                let message = if e.is_setup() { SETUP_FAILED } else { LISTEN_FAILED };
                error!(%path, "Failed to subscribe to LED state: {}", e);
                fail_subscription(&self.state, &self.bus, message).await;
            }
        }
        Ok(())
    }

    /// Release the state subscription; no-op when not mounted
    pub async fn unmount(&self) {
        let handle = {
            let mut slot = lock_slot(&self.subscription);
            slot.generation += 1;
            slot.handle.take()
        };
        if let Some(handle) = handle {
            handle.unmount().await;
        }
    }

    /// Write `command` to the command path and report the outcome.
    ///
    /// Only the loading flag is touched; the displayed LED state changes
    /// when the device reports back through the state path.
    pub async fn send_command(&self, command: Command) -> Notice {
        update_state(&self.state, &self.bus, |s| {
            s.loading = true;
            s.pending_commands += 1;
        })
        .await;

        let notice = match self
            .store
            .set(&self.paths.command, command.to_value())
            .await
        {
            Ok(()) => {
                info!(%command, "LED command sent");
                self.bus.publish(LedEvent::CommandSent { command });
                Notice::command_sent(command)
            }
            Err(e) => {
                error!(%command, "Error sending LED command: {}", e);
                self.bus.publish(LedEvent::CommandFailed {
                    command,
                    error: e.to_string(),
                });
                Notice::command_failed(&e)
            }
        };

        update_state(&self.state, &self.bus, |s| {
            s.pending_commands = s.pending_commands.saturating_sub(1);
            if s.pending_commands == 0 {
                s.loading = false;
            }
        })
        .await;

        notice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStore, StorePath, UnconfiguredStore};
    use crate::bus::create_bus;
    use crate::error::StoreError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::{broadcast, Notify};
    use tokio::time::timeout;

    fn paths() -> LedPaths {
        LedPaths::under("artifacts/test/led", "command", "currentLedState").unwrap()
    }

    fn controller(store: MemoryStore) -> LedController {
        LedController::new(Arc::new(store), paths(), create_bus())
    }

    /// Wait for the next published view matching `pred`
    async fn wait_for_view(
        rx: &mut broadcast::Receiver<LedEvent>,
        pred: impl Fn(&ScreenView) -> bool,
    ) -> ScreenView {
        timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(LedEvent::ViewChanged(snapshot)) = rx.recv().await {
                    if pred(&snapshot.view) {
                        return snapshot.view;
                    }
                }
            }
        })
        .await
        .expect("view never reached")
    }

    fn is_ready(view: &ScreenView) -> bool {
        matches!(view, ScreenView::Ready { .. })
    }

    #[tokio::test]
    async fn test_initial_view_is_loading() {
        let controller = controller(MemoryStore::new());
        assert_eq!(controller.view().await, ScreenView::Loading);
        assert_eq!(controller.snapshot().await.led_state, LedState::Unknown);
    }

    #[tokio::test]
    async fn test_absent_state_shows_off() {
        let controller = controller(MemoryStore::new());
        let mut rx = controller.bus().subscribe();

        controller.mount().await.unwrap();
        let view = wait_for_view(&mut rx, is_ready).await;
        assert_eq!(
            view,
            ScreenView::Ready {
                led_state: LedState::Off
            }
        );
        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_received_values_are_echoed_verbatim() {
        let store = MemoryStore::new();
        let controller = controller(store.clone());
        let mut rx = controller.bus().subscribe();

        controller.mount().await.unwrap();
        wait_for_view(&mut rx, is_ready).await;

        store.set(&paths().state, json!("Blinking")).await.unwrap();
        let view = wait_for_view(&mut rx, |v| {
            matches!(v, ScreenView::Ready { led_state } if led_state.as_str() == "Blinking")
        })
        .await;
        assert_eq!(
            view,
            ScreenView::Ready {
                led_state: LedState::Other("Blinking".to_string())
            }
        );
        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_write_failure_keeps_displayed_state() {
        let store = MemoryStore::new();
        store.set(&paths().state, json!("on")).await.unwrap();
        let controller = controller(store.clone());
        let mut rx = controller.bus().subscribe();

        controller.mount().await.unwrap();
        wait_for_view(&mut rx, is_ready).await;
        let before = controller.snapshot().await;

        store.fail_writes(Some("Permission denied")).await;
        let notice = controller.send_command(Command::Off).await;

        assert!(!notice.is_success());
        assert_eq!(notice.message, "Failed to send command: Permission denied");
        let after = controller.snapshot().await;
        assert_eq!(after.led_state, before.led_state);
        assert_eq!(after.error, None);
        assert_eq!(
            after.view,
            ScreenView::Ready {
                led_state: LedState::On
            }
        );
        assert_eq!(store.get(&paths().command).await, None);
        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_command_success_writes_literal() {
        let store = MemoryStore::with_device_echo(paths());
        let controller = controller(store.clone());
        let mut rx = controller.bus().subscribe();

        controller.mount().await.unwrap();
        wait_for_view(&mut rx, is_ready).await;

        let notice = controller.send_command(Command::On).await;
        assert!(notice.is_success());
        assert_eq!(notice.message, "LED command 'on' sent successfully.");
        assert_eq!(store.get(&paths().command).await, Some(json!("on")));

        wait_for_view(&mut rx, |v| {
            matches!(v, ScreenView::Ready { led_state: LedState::On })
        })
        .await;
        assert!(!controller.snapshot().await.command_in_flight);
        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_unmount_releases_subscription() {
        let store = MemoryStore::new();
        let controller = controller(store.clone());

        controller.mount().await.unwrap();
        assert_eq!(store.active_subscriptions(), 1);
        assert!(controller.is_mounted().await);

        controller.unmount().await;
        assert_eq!(store.active_subscriptions(), 0);
        assert!(!controller.is_mounted().await);

        // Unmounting twice is harmless
        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_double_mount_is_rejected() {
        let store = MemoryStore::new();
        let controller = controller(store.clone());

        controller.mount().await.unwrap();
        assert!(matches!(
            controller.mount().await,
            Err(ScreenError::AlreadyMounted)
        ));
        assert_eq!(store.active_subscriptions(), 1);
        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_subscribe_failure_shows_error_view() {
        let store = MemoryStore::new();
        store.fail_subscriptions(Some("Permission denied")).await;
        let controller = controller(store);

        controller.mount().await.unwrap();
        assert_eq!(
            controller.view().await,
            ScreenView::Error {
                message: LISTEN_FAILED.to_string()
            }
        );
        assert!(!controller.is_mounted().await);
    }

    #[tokio::test]
    async fn test_stream_error_is_terminal() {
        let store = MemoryStore::new();
        let controller = controller(store.clone());
        let mut rx = controller.bus().subscribe();

        controller.mount().await.unwrap();
        wait_for_view(&mut rx, is_ready).await;

        store.break_subscriptions("connection reset");
        let view = wait_for_view(&mut rx, |v| matches!(v, ScreenView::Error { .. })).await;
        assert_eq!(
            view,
            ScreenView::Error {
                message: LISTEN_FAILED.to_string()
            }
        );

        // No retry: later writes do not revive the view
        store.set(&paths().state, json!("on")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(controller.view().await, ScreenView::Error { .. }));
        assert_eq!(store.active_subscriptions(), 0);
    }

    /// Parks `subscribe` until released, then delegates to a memory store
    struct GatedStore {
        inner: MemoryStore,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl RealtimeStore for GatedStore {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn subscribe(&self, path: &StorePath) -> Result<ValueStream, StoreError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.subscribe(path).await
        }

        async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
            self.inner.set(path, value).await
        }
    }

    fn gated() -> (Arc<LedController>, MemoryStore, Arc<Notify>, Arc<Notify>) {
        let inner = MemoryStore::new();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let store = GatedStore {
            inner: inner.clone(),
            entered: entered.clone(),
            release: release.clone(),
        };
        let controller = Arc::new(LedController::new(Arc::new(store), paths(), create_bus()));
        (controller, inner, entered, release)
    }

    #[tokio::test]
    async fn test_slow_subscribe_does_not_block_status() {
        let (controller, inner, entered, release) = gated();

        let mounting = tokio::spawn({
            let controller = controller.clone();
            async move { controller.mount().await }
        });
        timeout(Duration::from_secs(2), entered.notified()).await.unwrap();

        let mounted = timeout(Duration::from_millis(200), controller.is_mounted())
            .await
            .expect("is_mounted waited on the pending subscribe");
        assert!(!mounted);
        assert!(matches!(
            controller.mount().await,
            Err(ScreenError::AlreadyMounted)
        ));

        release.notify_one();
        mounting.await.unwrap().unwrap();
        assert!(controller.is_mounted().await);
        assert_eq!(inner.active_subscriptions(), 1);

        controller.unmount().await;
        assert_eq!(inner.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_unmount_during_subscribe_drops_stream() {
        let (controller, inner, entered, release) = gated();

        let mounting = tokio::spawn({
            let controller = controller.clone();
            async move { controller.mount().await }
        });
        timeout(Duration::from_secs(2), entered.notified()).await.unwrap();

        controller.unmount().await;
        release.notify_one();
        mounting.await.unwrap().unwrap();

        assert!(!controller.is_mounted().await);
        assert_eq!(inner.active_subscriptions(), 0);

        // A cancelled mount does not leave the controller stuck
        let mounting = tokio::spawn({
            let controller = controller.clone();
            async move { controller.mount().await }
        });
        timeout(Duration::from_secs(2), entered.notified()).await.unwrap();
        mounting.abort();
        let _ = mounting.await;
        release.notify_one();
        controller.mount().await.unwrap();
        assert!(controller.is_mounted().await);
        controller.unmount().await;
    }

    #[tokio::test]
    async fn test_setup_failure_message() {
        let store = UnconfiguredStore::new("store.database_url is required");
        let controller = LedController::new(Arc::new(store), paths(), create_bus());
        let mut rx = controller.bus().subscribe();

        controller.mount().await.unwrap();
        assert_eq!(
            controller.view().await,
            ScreenView::Error {
                message: SETUP_FAILED.to_string()
            }
        );

        let mut saw_failure = false;
        while let Ok(event) = rx.try_recv() {
            if let LedEvent::SubscriptionFailed { message } = event {
                assert_eq!(message, SETUP_FAILED);
                saw_failure = true;
            }
        }
        assert!(saw_failure);
    }
}
