//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    #[error("REST error: {0}")]
    Rest(#[from] coinboard_rest::RestError),

    #[error("Feed error: {0}")]
    Feed(#[from] coinboard_feed::FeedError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] coinboard_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
