//! WebSocket broadcast functionality.
//!
//! The broadcaster waits for the application loop to publish a new view and
//! fans the serialized snapshot out to all connected WebSocket clients.

use tokio::sync::{broadcast, watch};
use tracing::{debug, trace};

use coinboard_feed::BoardView;

use crate::types::{BoardSnapshot, DashboardMessage};

/// Run the broadcaster task until the view channel closes.
pub async fn run_broadcaster(mut view_rx: watch::Receiver<BoardView>, tx: broadcast::Sender<String>) {
    while view_rx.changed().await.is_ok() {
        let snapshot = BoardSnapshot::from_view(&view_rx.borrow_and_update());
        let msg = DashboardMessage::Update(snapshot);

        match serde_json::to_string(&msg) {
            Ok(json) => match tx.send(json) {
                Ok(n) => {
                    trace!(receivers = n, "Broadcast update sent");
                }
                Err(_) => {
                    trace!("No WebSocket receivers connected");
                }
            },
            Err(e) => {
                debug!(error = %e, "Failed to serialize dashboard update");
            }
        }
    }
    debug!("View channel closed, broadcaster stopping");
}
