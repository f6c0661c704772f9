//! Feed connection manager.
//!
//! Runs one streaming subscription: connects, forwards parsed price frames
//! tagged with the subscription handle, monitors the heartbeat, and
//! reconnects with exponential backoff when the policy allows it.

use crate::config::{FeedConfig, ReconnectConfig};
use crate::error::{WsError, WsResult};
use crate::heartbeat::{HeartbeatAction, HeartbeatManager};
use crate::message::parse_prices;
use crate::subscription::SubscriptionHandle;
use coinboard_core::{AssetId, Price};
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection configuration for one subscription.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Full streaming URL including the asset list.
    pub url: String,
    pub reconnect: ReconnectConfig,
    /// Idle time before a ping is sent.
    pub heartbeat_interval_ms: u64,
    /// Time allowed for any frame after a ping.
    pub heartbeat_timeout_ms: u64,
}

impl ConnectionConfig {
    /// Build the configuration for `handle` from the feed section.
    pub fn for_subscription(feed: &FeedConfig, handle: &SubscriptionHandle) -> Self {
        Self {
            url: handle.feed_url(&feed.ws_url, feed.api_key.as_deref()),
            reconnect: feed.reconnect.clone(),
            heartbeat_interval_ms: feed.heartbeat_interval_ms,
            heartbeat_timeout_ms: feed.heartbeat_timeout_ms,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    /// Numeric value for the state gauge.
    pub fn as_gauge(&self) -> i64 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Open => 2,
            Self::Closed => 3,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Events emitted by a connection.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// A price frame for the subscription `handle`.
    Prices {
        handle: SubscriptionHandle,
        prices: HashMap<AssetId, Price>,
    },
    /// The connection moved to `state`.
    State { generation: u64, state: ConnectionState },
    /// The connection dropped without being asked to.
    Disconnected {
        generation: u64,
        reason: String,
        will_retry: bool,
    },
}

/// Feed connection manager.
pub struct ConnectionManager {
    config: ConnectionConfig,
    handle: SubscriptionHandle,
    state: RwLock<ConnectionState>,
    heartbeat: HeartbeatManager,
    event_tx: mpsc::Sender<FeedEvent>,
    reconnect_count: RwLock<u32>,
    shutdown_token: CancellationToken,
}

impl ConnectionManager {
    pub fn new(
        config: ConnectionConfig,
        handle: SubscriptionHandle,
        event_tx: mpsc::Sender<FeedEvent>,
    ) -> Self {
        let heartbeat =
            HeartbeatManager::new(config.heartbeat_interval_ms, config.heartbeat_timeout_ms);
        Self {
            config,
            handle,
            state: RwLock::new(ConnectionState::Disconnected),
            heartbeat,
            event_tx,
            reconnect_count: RwLock::new(0),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn handle(&self) -> &SubscriptionHandle {
        &self.handle
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn reconnect_count(&self) -> u32 {
        *self.reconnect_count.read()
    }

    /// Signal graceful shutdown.
    ///
    /// The message loop sends a close frame and exits; a pending backoff
    /// sleep is cut short.
    pub fn shutdown(&self) {
        debug!(generation = self.handle.generation(), "ConnectionManager shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect and run until shutdown or until the reconnect policy gives up.
    pub async fn run(&self) -> WsResult<()> {
        let result = self.connect_with_retry().await;
        self.set_state(ConnectionState::Closed).await;
        result
    }

    async fn set_state(&self, state: ConnectionState) {
        {
            let mut current = self.state.write();
            if *current == state {
                return;
            }
            *current = state;
        }
        let event = FeedEvent::State {
            generation: self.handle.generation(),
            state,
        };
        if self.event_tx.send(event).await.is_err() {
            debug!("Feed event receiver dropped");
        }
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        loop {
            if self.is_shutdown() {
                return Ok(());
            }

            self.set_state(ConnectionState::Connecting).await;

            let reason = match self.try_connect().await {
                Ok(()) if self.is_shutdown() => return Ok(()),
                Ok(()) => "stream ended".to_string(),
                Err(e) => {
                    error!(error = %e, generation = self.handle.generation(), "Feed connection error");
                    e.to_string()
                }
            };

            if self.is_shutdown() {
                return Ok(());
            }

            let attempt = {
                let mut count = self.reconnect_count.write();
                *count += 1;
                *count
            };
            let policy = &self.config.reconnect;
            let will_retry =
                policy.enabled && (policy.max_attempts == 0 || attempt < policy.max_attempts);

            let event = FeedEvent::Disconnected {
                generation: self.handle.generation(),
                reason: reason.clone(),
                will_retry,
            };
            if self.event_tx.send(event).await.is_err() {
                debug!("Feed event receiver dropped");
            }

            if !policy.enabled {
                info!(%reason, "Feed dropped, reconnect disabled");
                return Ok(());
            }
            if !will_retry {
                error!(attempt, "Max reconnection attempts reached");
                return Err(WsError::ConnectionFailed(
                    "Max reconnection attempts reached".to_string(),
                ));
            }

            self.set_state(ConnectionState::Connecting).await;

            let delay = calculate_backoff_delay(policy, attempt);
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during backoff, exiting");
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        info!(
            url = %self.config.url,
            generation = self.handle.generation(),
            assets = self.handle.assets().len(),
            "Connecting to price feed"
        );

        let connect = connect_async_tls_with_config(&self.config.url, None, true, None);
        let (ws_stream, _response) = tokio::select! {
            result = connect => result?,
            () = self.shutdown_token.cancelled() => return Ok(()),
        };
        let (mut write, mut read) = ws_stream.split();

        *self.reconnect_count.write() = 0;
        self.heartbeat.reset();
        self.set_state(ConnectionState::Open).await;
        info!(generation = self.handle.generation(), "Price feed open");

        loop {
            tokio::select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    // Drain until the peer acknowledges the close.
                    while let Some(Ok(msg)) = read.next().await {
                        if msg.is_close() {
                            break;
                        }
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    if msg.is_some() {
                        self.heartbeat.record_frame();
                    }
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text_message(&text).await;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Price feed closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            warn!("Price feed stream ended");
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                    }
                }

                () = self.heartbeat.wait_for_check() => {
                    match self.heartbeat.check() {
                        HeartbeatAction::TimedOut => {
                            error!("Heartbeat timeout");
                            return Err(WsError::HeartbeatTimeout);
                        }
                        HeartbeatAction::SendPing => {
                            write.send(Message::Ping(Vec::new())).await?;
                            self.heartbeat.record_ping();
                            debug!("Sent heartbeat ping");
                        }
                        HeartbeatAction::Idle => {}
                    }
                }
            }
        }
    }

    async fn handle_text_message(&self, text: &str) {
        let prices = match parse_prices(text) {
            Ok(prices) => prices,
            Err(e) => {
                warn!(error = %e, "Dropping malformed feed frame");
                return;
            }
        };
        if prices.is_empty() {
            return;
        }

        let event = FeedEvent::Prices {
            handle: self.handle.clone(),
            prices,
        };
        if self.event_tx.send(event).await.is_err() {
            warn!("Feed event receiver dropped");
        }
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped, plus jitter.
fn calculate_backoff_delay(policy: &ReconnectConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = policy
        .base_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(policy.max_delay_ms);
    Duration::from_millis(delay + rand_jitter(policy.base_delay_ms))
}

/// Jitter in `0..bound` ms.
fn rand_jitter(bound: u64) -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    if bound == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos) % bound
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn policy(base: u64, max: u64) -> ReconnectConfig {
        ReconnectConfig {
            enabled: true,
            max_attempts: 0,
            base_delay_ms: base,
            max_delay_ms: max,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = policy(100, 1_000);
        let ms = |attempt| calculate_backoff_delay(&p, attempt).as_millis() as u64;

        assert!((100..200).contains(&ms(1)));
        assert!((200..300).contains(&ms(2)));
        assert!((400..500).contains(&ms(3)));
        assert!((1_000..1_100).contains(&ms(10)));
        assert!((1_000..1_100).contains(&ms(u32::MAX)));
    }

    #[test]
    fn test_zero_base_has_no_jitter() {
        assert_eq!(calculate_backoff_delay(&policy(0, 0), 3), Duration::ZERO);
    }

    #[test]
    fn test_connection_config_for_subscription() {
        let feed = FeedConfig {
            ws_url: "ws://127.0.0.1:9/prices".to_string(),
            ..Default::default()
        };
        let handle = SubscriptionHandle::new(
            7,
            ["bitcoin", "ethereum"].into_iter().map(AssetId::from).collect::<BTreeSet<_>>(),
        );

        let config = ConnectionConfig::for_subscription(&feed, &handle);

        assert_eq!(config.url, "ws://127.0.0.1:9/prices?assets=bitcoin,ethereum");
        assert_eq!(config.heartbeat_interval_ms, feed.heartbeat_interval_ms);
        assert!(config.reconnect.enabled);
    }

    #[tokio::test]
    async fn test_shutdown_before_run_closes_immediately() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = SubscriptionHandle::new(1, BTreeSet::new());
        let config = ConnectionConfig::for_subscription(&FeedConfig::default(), &handle);
        let manager = ConnectionManager::new(config, handle, tx);

        manager.shutdown();
        manager.run().await.unwrap();

        assert_eq!(manager.state(), ConnectionState::Closed);
        assert!(matches!(
            rx.recv().await,
            Some(FeedEvent::State { state: ConnectionState::Closed, .. })
        ));
    }
}
