//! Error types for coinboard-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid page: {page} (page count {page_count})")]
    InvalidPage { page: u32, page_count: u32 },

    #[error("Invalid page size: {0}")]
    InvalidPageSize(u32),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
