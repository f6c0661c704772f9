//! REST error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("Primary fetch failed for page {page}: {reason}")]
    PrimaryFetchFailed { page: u32, reason: String },

    #[error("Secondary fetch failed for page {page}: {reason}")]
    SecondaryFetchFailed { page: u32, reason: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid page: {0}")]
    InvalidPage(#[from] coinboard_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type RestResult<T> = Result<T, RestError>;
