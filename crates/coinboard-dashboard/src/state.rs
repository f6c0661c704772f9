//! Dashboard state.
//!
//! Read side of the board: the latest view from the application loop plus the
//! channel page requests travel back on.

use coinboard_feed::{BoardView, PageRequest};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::types::BoardSnapshot;

/// Page request rejected before reaching the engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageRequestError {
    #[error("page {page} out of range 1..={page_count}")]
    OutOfRange { page: u32, page_count: u32 },

    #[error("board is shutting down")]
    Closed,
}

/// Handle shared by every request handler.
#[derive(Clone)]
pub struct DashboardState {
    view_rx: watch::Receiver<BoardView>,
    requests: mpsc::Sender<PageRequest>,
}

impl DashboardState {
    pub fn new(view_rx: watch::Receiver<BoardView>, requests: mpsc::Sender<PageRequest>) -> Self {
        Self { view_rx, requests }
    }

    /// Snapshot of the latest published view.
    pub fn collect_snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::from_view(&self.view_rx.borrow())
    }

    /// A fresh receiver for change notifications.
    pub fn subscribe(&self) -> watch::Receiver<BoardView> {
        self.view_rx.clone()
    }

    /// Ask the engine to show one-based `page`.
    pub async fn request_page(&self, page: u32) -> Result<(), PageRequestError> {
        let page_count = self.view_rx.borrow().page_count;
        if page == 0 || page > page_count {
            return Err(PageRequestError::OutOfRange { page, page_count });
        }
        self.requests
            .send(PageRequest { page_index: page })
            .await
            .map_err(|_| PageRequestError::Closed)?;
        debug!(page, "Page request forwarded");
        Ok(())
    }
}
