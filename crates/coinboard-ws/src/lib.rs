//! Live price feed for coinboard.
//!
//! Owns the streaming subscription lifecycle:
//! - One connection per subscription, scoped to exactly one page's identifiers
//! - Tear-down-and-recreate on every page replacement
//! - Optional reconnection with exponential backoff
//! - Heartbeat monitoring (protocol ping after idle, timeout detection)
//! - Channel-based event delivery tagged with the subscription handle

pub mod config;
pub mod connection;
pub mod connector;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod subscription;

pub use config::{FeedConfig, ReconnectConfig};
pub use connection::{ConnectionConfig, ConnectionManager, ConnectionState, FeedEvent};
pub use connector::FeedConnector;
pub use error::{WsError, WsResult};
pub use message::parse_prices;
pub use subscription::SubscriptionHandle;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any feed connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
