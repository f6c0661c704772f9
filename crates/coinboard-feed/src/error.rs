//! Board error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid page: {0}")]
    InvalidPage(#[from] coinboard_core::CoreError),

    #[error("Stale delta discarded: subscription generation {handle_generation}, current page generation {page_generation}")]
    StaleDeltaDiscarded {
        handle_generation: u64,
        page_generation: u64,
    },
}

pub type FeedResult<T> = Result<T, FeedError>;
