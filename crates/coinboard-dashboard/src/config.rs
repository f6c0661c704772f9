//! Dashboard configuration.

use serde::{Deserialize, Serialize};

/// Dashboard server configuration (`[dashboard]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Enable dashboard server.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_enabled() -> bool {
    false
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> usize {
    10
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: default_port(),
            max_connections: default_max_connections(),
        }
    }
}
