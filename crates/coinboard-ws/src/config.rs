//! Feed configuration.

use serde::{Deserialize, Serialize};

/// Live feed configuration (`[feed]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Streaming endpoint; `?assets=` is appended per subscription.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Optional API key, appended as `apiKey` query parameter.
    #[serde(default)]
    pub api_key: Option<String>,
    /// How long teardown waits for the connection task before aborting it (ms).
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
    /// Idle time before a protocol ping is sent (ms).
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Time allowed for any frame after a ping (ms).
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_ws_url() -> String {
    "wss://ws.coincap.io/prices".to_string()
}

fn default_close_timeout_ms() -> u64 {
    1_000
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            api_key: None,
            close_timeout_ms: default_close_timeout_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Reconnection policy after an unexpected drop (`[feed.reconnect]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// When `false`, a drop closes the subscription for good.
    #[serde(default = "default_reconnect_enabled")]
    pub enabled: bool,
    /// Maximum consecutive attempts (0 = unbounded).
    #[serde(default)]
    pub max_attempts: u32,
    /// Base delay for exponential backoff (ms).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff cap (ms).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_reconnect_enabled() -> bool {
    true
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconnect_enabled(),
            max_attempts: 0,
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}
