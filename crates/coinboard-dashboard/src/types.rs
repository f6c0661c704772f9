//! Dashboard API types.
//!
//! These types are used for JSON serialization in REST and WebSocket APIs.

use coinboard_core::{AssetId, ChangeDirection, MarketRecord, Percent, Price};
use coinboard_feed::{BoardStatus, BoardView};
use coinboard_ws::ConnectionState;
use rust_decimal::Decimal;
use serde::Serialize;

/// Full board snapshot (sent on connect, on change and via REST).
#[derive(Debug, Clone, Serialize)]
pub struct BoardSnapshot {
    /// Timestamp when snapshot was taken (Unix milliseconds).
    pub timestamp_ms: i64,
    /// One-based page index.
    pub page_index: u32,
    pub page_count: u32,
    pub generation: u64,
    pub revision: u64,
    pub status: BoardStatus,
    pub feed_state: ConnectionState,
    /// Whether the 7d fields are present on every row.
    pub enriched: bool,
    pub rows: Vec<RowSnapshot>,
}

/// One board row with its current change signal.
#[derive(Debug, Clone, Serialize)]
pub struct RowSnapshot {
    pub id: AssetId,
    pub rank: u32,
    pub symbol: String,
    pub name: String,
    pub price_usd: Price,
    pub market_cap_usd: Decimal,
    pub change_percent_24h: Percent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent_7d: Option<Percent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparkline_7d: Option<Vec<Decimal>>,
    pub signal: ChangeDirection,
}

impl RowSnapshot {
    fn new(record: &MarketRecord, signal: ChangeDirection) -> Self {
        Self {
            id: record.id.clone(),
            rank: record.rank,
            symbol: record.symbol.clone(),
            name: record.name.clone(),
            price_usd: record.price_usd,
            market_cap_usd: record.market_cap_usd,
            change_percent_24h: record.change_percent_24h,
            change_percent_7d: record.change_percent_7d,
            sparkline_7d: record.sparkline_7d.clone(),
            signal,
        }
    }
}

impl BoardSnapshot {
    /// Build a snapshot of `view` stamped with the current wall-clock time.
    pub fn from_view(view: &BoardView) -> Self {
        let rows = view
            .page
            .records
            .iter()
            .map(|record| {
                let signal = view
                    .signals
                    .get(&record.id)
                    .copied()
                    .unwrap_or_default();
                RowSnapshot::new(record, signal)
            })
            .collect();

        Self {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            page_index: view.page.index,
            page_count: view.page_count,
            generation: view.page.generation,
            revision: view.page.revision,
            status: view.status.clone(),
            feed_state: view.feed_state,
            enriched: view.page.is_enriched(),
            rows,
        }
    }
}

/// WebSocket message types (tagged enum for type safety).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Full snapshot (sent on connect).
    Snapshot(BoardSnapshot),
    /// Board changed.
    Update(BoardSnapshot),
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinboard_core::Page;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn record(id: &str, price: Decimal) -> MarketRecord {
        MarketRecord {
            id: AssetId::from(id),
            rank: 1,
            symbol: id.to_uppercase(),
            name: id.to_string(),
            price_usd: Price::new(price),
            market_cap_usd: dec!(1000),
            change_percent_24h: Percent::new(dec!(-1.25)),
            change_percent_7d: None,
            sparkline_7d: None,
        }
    }

    fn view() -> BoardView {
        let mut page = Page::new(
            1,
            15,
            2296,
            vec![record("bitcoin", dec!(105)), record("ethereum", dec!(10))],
        );
        page.generation = 3;
        page.revision = 7;
        let signals = BTreeMap::from([(AssetId::from("bitcoin"), ChangeDirection::Increased)]);
        BoardView {
            page: Arc::new(page),
            signals: Arc::new(signals),
            status: BoardStatus::Live,
            feed_state: ConnectionState::Open,
            page_count: 154,
        }
    }

    #[test]
    fn test_snapshot_carries_signals_per_row() {
        let snapshot = BoardSnapshot::from_view(&view());

        assert_eq!(snapshot.page_index, 1);
        assert_eq!(snapshot.generation, 3);
        assert_eq!(snapshot.revision, 7);
        assert!(!snapshot.enriched);
        assert_eq!(snapshot.rows[0].signal, ChangeDirection::Increased);
        assert_eq!(snapshot.rows[1].signal, ChangeDirection::None);
    }

    #[test]
    fn test_snapshot_serialization() {
        let json = serde_json::to_string(&BoardSnapshot::from_view(&view())).unwrap();

        assert!(json.contains("\"status\":{\"state\":\"live\"}"));
        assert!(json.contains("\"feed_state\":\"open\""));
        assert!(json.contains("\"signal\":\"increased\""));
        assert!(json.contains("\"price_usd\":\"105\""));
        assert!(!json.contains("sparkline_7d"));
    }

    #[test]
    fn test_message_tagging() {
        let msg = DashboardMessage::Update(BoardSnapshot::from_view(&view()));

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"update\""));
        assert!(json.contains("\"page_count\":154"));
    }
}
