//! Live state feed
//!
//! Pushes a fresh state snapshot to every registered subscriber at a fixed
//! cadence. Subscribers are independent: a failed send unregisters that
//! subscriber and never blocks delivery to the others. Messages to one
//! subscriber are strictly ordered; ordering across subscribers is
//! unspecified.

use async_trait::async_trait;
use parking_lot::RwLock;
use routerkit_core::MachineState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Publish cadence of the live feed (~5 Hz)
const PUBLISH_INTERVAL: Duration = Duration::from_millis(200);

/// Handle for a registered subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberHandle(Uuid);

impl SubscriberHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriberHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", &self.0.to_string()[..8])
    }
}

/// Receiver of state snapshots
///
/// Implemented by the collaborator delivering the live feed (a WebSocket
/// session, a test channel). Returning an error drops the subscription.
#[async_trait]
pub trait StateSubscriber: Send + Sync {
    /// Deliver one snapshot
    async fn send_state(&self, state: &MachineState) -> routerkit_core::Result<()>;
}

/// Fan-out of state snapshots to live subscribers
pub struct StateBroadcaster {
    subscribers: RwLock<HashMap<SubscriberHandle, Arc<dyn StateSubscriber>>>,
    interval: Duration,
}

impl StateBroadcaster {
    /// Create a broadcaster at the default ~5 Hz cadence
    pub fn new() -> Self {
        Self::with_interval(PUBLISH_INTERVAL)
    }

    /// Create a broadcaster with a custom cadence
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            interval,
        }
    }

    /// Register a subscriber for the live feed
    pub fn register(&self, subscriber: Arc<dyn StateSubscriber>) -> SubscriberHandle {
        let handle = SubscriberHandle::new();
        self.subscribers.write().insert(handle, subscriber);
        tracing::debug!("subscriber {} added", handle);
        handle
    }

    /// Drop a subscriber; returns true if it was registered
    pub fn unregister(&self, handle: SubscriberHandle) -> bool {
        let removed = self.subscribers.write().remove(&handle).is_some();
        if removed {
            tracing::debug!("subscriber {} removed", handle);
        }
        removed
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Push one snapshot to every subscriber, dropping any that fail
    pub async fn publish(&self, state: &MachineState) {
        let subscribers: Vec<(SubscriberHandle, Arc<dyn StateSubscriber>)> = self
            .subscribers
            .read()
            .iter()
            .map(|(handle, sub)| (*handle, sub.clone()))
            .collect();

        let mut dead = Vec::new();
        for (handle, subscriber) in subscribers {
            if subscriber.send_state(state).await.is_err() {
                dead.push(handle);
            }
        }
        for handle in dead {
            self.unregister(handle);
        }
    }

    /// Start the publisher task
    ///
    /// `snapshot` is called once per tick; it must be cheap and must not
    /// block (the controller's `snapshot()` qualifies). The task runs until
    /// aborted.
    pub fn spawn<F>(self: Arc<Self>, snapshot: F) -> tokio::task::JoinHandle<()>
    where
        F: Fn() -> MachineState + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let state = snapshot();
                self.publish(&state).await;
            }
        })
    }
}

impl Default for StateBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routerkit_core::{Error, MachineStatus};
    use tokio::sync::mpsc;

    /// Subscriber backed by a channel
    struct ChannelSubscriber {
        tx: mpsc::UnboundedSender<MachineState>,
    }

    #[async_trait]
    impl StateSubscriber for ChannelSubscriber {
        async fn send_state(&self, state: &MachineState) -> routerkit_core::Result<()> {
            self.tx
                .send(state.clone())
                .map_err(|_| Error::transport("feed receiver gone"))
        }
    }

    /// Subscriber that always fails
    struct BrokenSubscriber;

    #[async_trait]
    impl StateSubscriber for BrokenSubscriber {
        async fn send_state(&self, _state: &MachineState) -> routerkit_core::Result<()> {
            Err(Error::transport("always broken"))
        }
    }

    #[tokio::test]
    async fn delivers_snapshots_in_order() {
        let broadcaster = StateBroadcaster::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.register(Arc::new(ChannelSubscriber { tx }));

        for line in [1u64, 2, 3] {
            let state = MachineState {
                current_line: line,
                ..Default::default()
            };
            broadcaster.publish(&state).await;
        }

        assert_eq!(rx.recv().await.unwrap().current_line, 1);
        assert_eq!(rx.recv().await.unwrap().current_line, 2);
        assert_eq!(rx.recv().await.unwrap().current_line, 3);
    }

    #[tokio::test]
    async fn failed_subscriber_is_dropped_without_blocking_others() {
        let broadcaster = StateBroadcaster::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.register(Arc::new(BrokenSubscriber));
        broadcaster.register(Arc::new(ChannelSubscriber { tx }));
        assert_eq!(broadcaster.subscriber_count(), 2);

        broadcaster.publish(&MachineState::default()).await;
        assert_eq!(broadcaster.subscriber_count(), 1);
        assert_eq!(rx.recv().await.unwrap().status, MachineStatus::Idle);

        // Publishing again only reaches the survivor.
        broadcaster.publish(&MachineState::default()).await;
        assert_eq!(broadcaster.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let broadcaster = StateBroadcaster::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = broadcaster.register(Arc::new(ChannelSubscriber { tx }));
        assert!(broadcaster.unregister(handle));
        assert!(!broadcaster.unregister(handle));
    }

    #[tokio::test]
    async fn publisher_task_ticks() {
        let broadcaster = Arc::new(StateBroadcaster::with_interval(Duration::from_millis(10)));
        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.register(Arc::new(ChannelSubscriber { tx }));

        let task = broadcaster.clone().spawn(MachineState::default);
        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("feed should tick")
            .unwrap();
        assert_eq!(first.status, MachineStatus::Idle);
        task.abort();
    }
}
