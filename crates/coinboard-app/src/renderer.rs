//! Log renderer.
//!
//! Minimal render collaborator: follows the published `BoardView` and writes
//! status changes and a compact row summary to the log.

use coinboard_core::{ChangeDirection, MarketRecord};
use coinboard_feed::{BoardStatus, BoardView};
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Tracks what was last rendered so only changes are logged.
#[derive(Debug, Default)]
pub struct LogRenderer {
    last_status: Option<BoardStatus>,
    last_generation: Option<u64>,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `view`. Returns whether the status changed.
    pub fn render(&mut self, view: &BoardView) -> bool {
        let status_changed = self.last_status.as_ref() != Some(&view.status);
        if status_changed {
            info!(
                page = view.page.index,
                page_count = view.page_count,
                status = ?view.status,
                feed = %view.feed_state,
                "Board status"
            );
            self.last_status = Some(view.status.clone());
        }

        if self.last_generation != Some(view.page.generation) {
            self.last_generation = Some(view.page.generation);
            for record in &view.page.records {
                debug!("{}", row_line(record, ChangeDirection::None));
            }
        } else {
            for (id, direction) in view.signals.iter() {
                if let Some(record) = view.page.get(id.as_str()) {
                    trace!("{}", row_line(record, *direction));
                }
            }
        }
        status_changed
    }
}

/// One-line summary: rank, symbol, price and signal marker.
pub fn row_line(record: &MarketRecord, signal: ChangeDirection) -> String {
    let marker = match signal {
        ChangeDirection::Increased => "+",
        ChangeDirection::Decreased => "-",
        ChangeDirection::None => " ",
    };
    let trend = match &record.change_percent_7d {
        Some(pct) => format!(" 7d {pct}"),
        None => String::new(),
    };
    format!(
        "#{:<4} {:<8} {}{} 24h {}{}",
        record.rank, record.symbol, marker, record.price_usd, record.change_percent_24h, trend
    )
}

/// Follow `view_rx` until the sender is dropped.
pub async fn run_log_renderer(mut view_rx: watch::Receiver<BoardView>) {
    let mut renderer = LogRenderer::new();
    renderer.render(&view_rx.borrow_and_update());
    while view_rx.changed().await.is_ok() {
        renderer.render(&view_rx.borrow_and_update());
    }
    debug!("View channel closed, log renderer stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinboard_core::{AssetId, Page, Percent, Price};
    use coinboard_ws::ConnectionState;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn record() -> MarketRecord {
        MarketRecord {
            id: AssetId::from("bitcoin"),
            rank: 1,
            symbol: "BTC".to_string(),
            name: "Bitcoin".to_string(),
            price_usd: Price::new(dec!(105)),
            market_cap_usd: dec!(1000),
            change_percent_24h: Percent::new(dec!(-0.5)),
            change_percent_7d: Some(Percent::new(dec!(3.2))),
            sparkline_7d: Some(vec![dec!(1)]),
        }
    }

    fn view(status: BoardStatus) -> BoardView {
        BoardView {
            page: Arc::new(Page::new(1, 15, 2296, vec![record()])),
            signals: Arc::new(BTreeMap::new()),
            status,
            feed_state: ConnectionState::Open,
            page_count: 154,
        }
    }

    #[test]
    fn test_row_line() {
        let line = row_line(&record(), ChangeDirection::Increased);
        assert_eq!(line, "#1    BTC      +105 24h -0.5% 7d 3.2%");
    }

    #[test]
    fn test_status_change_detected_once() {
        let mut renderer = LogRenderer::new();

        assert!(renderer.render(&view(BoardStatus::Live)));
        assert!(!renderer.render(&view(BoardStatus::Live)));
        assert!(renderer.render(&view(BoardStatus::Degraded {
            reason: "stream ended".to_string()
        })));
    }
}
