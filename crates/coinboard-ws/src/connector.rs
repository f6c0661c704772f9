//! Live feed connector.
//!
//! Holds at most one active subscription. Every `subscribe` tears down the
//! previous connection first: the close frame is sent, the connection task
//! is awaited for `close_timeout_ms` and aborted if it has not finished.

use crate::config::FeedConfig;
use crate::connection::{ConnectionConfig, ConnectionManager, ConnectionState, FeedEvent};
use crate::error::WsResult;
use crate::subscription::SubscriptionHandle;
use coinboard_core::AssetId;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct ActiveFeed {
    handle: SubscriptionHandle,
    manager: Arc<ConnectionManager>,
    task: JoinHandle<WsResult<()>>,
}

/// Owns the streaming subscription lifecycle.
pub struct FeedConnector {
    config: FeedConfig,
    event_tx: mpsc::Sender<FeedEvent>,
    active: Option<ActiveFeed>,
}

impl FeedConnector {
    pub fn new(config: FeedConfig, event_tx: mpsc::Sender<FeedEvent>) -> Self {
        Self {
            config,
            event_tx,
            active: None,
        }
    }

    /// Replace the active subscription with one scoped to `assets`.
    ///
    /// An empty identifier set tears down the old subscription without
    /// opening a new connection.
    pub async fn subscribe(
        &mut self,
        generation: u64,
        assets: BTreeSet<AssetId>,
    ) -> SubscriptionHandle {
        self.teardown().await;

        let handle = SubscriptionHandle::new(generation, assets);
        if handle.is_empty() {
            debug!(generation, "Empty identifier set, no feed connection");
            return handle;
        }

        let config = ConnectionConfig::for_subscription(&self.config, &handle);
        let manager = Arc::new(ConnectionManager::new(
            config,
            handle.clone(),
            self.event_tx.clone(),
        ));
        let task = tokio::spawn({
            let manager = manager.clone();
            async move { manager.run().await }
        });

        info!(generation, assets = handle.assets().len(), "Feed subscription opened");
        self.active = Some(ActiveFeed {
            handle: handle.clone(),
            manager,
            task,
        });
        handle
    }

    /// Tear down the subscription identified by `handle`.
    ///
    /// Returns `false` if `handle` is not the active subscription.
    pub async fn unsubscribe(&mut self, handle: &SubscriptionHandle) -> bool {
        let is_active = self
            .active
            .as_ref()
            .is_some_and(|active| &active.handle == handle);
        if is_active {
            self.teardown().await;
        }
        is_active
    }

    pub fn active_handle(&self) -> Option<&SubscriptionHandle> {
        self.active.as_ref().map(|active| &active.handle)
    }

    /// State of the active connection, `Disconnected` when there is none.
    pub fn state(&self) -> ConnectionState {
        self.active
            .as_ref()
            .map_or(ConnectionState::Disconnected, |active| active.manager.state())
    }

    /// Tear down the active subscription, if any.
    pub async fn shutdown(&mut self) {
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        let generation = active.handle.generation();
        active.manager.shutdown();

        let close_timeout = Duration::from_millis(self.config.close_timeout_ms);
        match tokio::time::timeout(close_timeout, &mut active.task).await {
            Ok(Ok(Ok(()))) => debug!(generation, "Feed subscription closed"),
            Ok(Ok(Err(e))) => debug!(generation, error = %e, "Feed subscription ended with error"),
            Ok(Err(e)) => warn!(generation, error = %e, "Feed task failed"),
            Err(_) => {
                warn!(generation, "Feed close timed out, aborting connection task");
                active.task.abort();
            }
        }
    }
}

impl Drop for FeedConnector {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.manager.shutdown();
            active.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> BTreeSet<AssetId> {
        list.iter().map(|s| AssetId::from(*s)).collect()
    }

    #[tokio::test]
    async fn test_empty_subscription_opens_nothing() {
        let (tx, _rx) = mpsc::channel(8);
        let mut connector = FeedConnector::new(FeedConfig::default(), tx);

        let handle = connector.subscribe(1, BTreeSet::new()).await;

        assert!(handle.is_empty());
        assert!(connector.active_handle().is_none());
        assert_eq!(connector.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_unsubscribe_ignores_foreign_handle() {
        let (tx, _rx) = mpsc::channel(8);
        let config = FeedConfig {
            ws_url: "ws://127.0.0.1:1/prices".to_string(),
            ..Default::default()
        };
        let mut connector = FeedConnector::new(config, tx);

        let active = connector.subscribe(2, ids(&["bitcoin"])).await;
        let foreign = SubscriptionHandle::new(1, ids(&["bitcoin"]));

        assert!(!connector.unsubscribe(&foreign).await);
        assert_eq!(connector.active_handle(), Some(&active));
        assert!(connector.unsubscribe(&active).await);
        assert!(connector.active_handle().is_none());
    }
}
