//! Application configuration.

use crate::error::{AppError, AppResult};
use ::config::{Config, Environment, File, FileFormat};
use coinboard_core::page::validate_page;
use coinboard_dashboard::DashboardConfig;
use coinboard_feed::BoardConfig;
use coinboard_rest::{MergeConfig, PrimaryConfig, SecondaryConfig};
use coinboard_telemetry::TelemetryConfig;
use coinboard_ws::FeedConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "COINBOARD_CONFIG";

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix for per-key overrides, e.g. `COINBOARD__BOARD__PAGE_SIZE=20`.
const ENV_PREFIX: &str = "COINBOARD";

/// Complete application configuration.
///
/// Every section has serde defaults, so an empty file is a working
/// configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub primary: PrimaryConfig,
    #[serde(default)]
    pub secondary: SecondaryConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Where the configuration file is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: String,
    /// An explicit path must exist; the default one may be absent.
    pub required: bool,
}

impl ConfigLocation {
    /// Path: `path` > `COINBOARD_CONFIG` > `config/default.toml`.
    pub fn resolve(path: Option<&str>) -> Self {
        match path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        {
            Some(path) => Self {
                path,
                required: true,
            },
            None => Self {
                path: DEFAULT_CONFIG_PATH.to_string(),
                required: false,
            },
        }
    }

    /// Whether an optional file is absent, so only defaults and the
    /// environment apply.
    pub fn is_missing(&self) -> bool {
        !self.required && !Path::new(&self.path).exists()
    }
}

impl AppConfig {
    /// Load configuration from `location`, with `COINBOARD__*` environment
    /// variables layered on top.
    pub fn load(location: &ConfigLocation) -> AppResult<Self> {
        let config: Self = Config::builder()
            .add_source(
                File::new(&location.path, FileFormat::Toml).required(location.required),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, without environment overrides.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        let board = &self.board;
        if board.page_size == 0 || board.total_count == 0 {
            return Err(AppError::Config(
                "board.page_size and board.total_count must be positive".to_string(),
            ));
        }
        validate_page(board.initial_page, board.page_size, board.total_count)
            .map_err(|e| AppError::Config(format!("board.initial_page: {e}")))?;
        if board.dwell_ms == 0 {
            return Err(AppError::Config("board.dwell_ms must be positive".to_string()));
        }
        if self.feed.heartbeat_interval_ms == 0 || self.feed.heartbeat_timeout_ms == 0 {
            return Err(AppError::Config(
                "feed heartbeat interval and timeout must be positive".to_string(),
            ));
        }
        if self.feed.reconnect.base_delay_ms > self.feed.reconnect.max_delay_ms {
            return Err(AppError::Config(
                "feed.reconnect.base_delay_ms exceeds max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}
