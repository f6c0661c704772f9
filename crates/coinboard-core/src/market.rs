//! Market record types.

use crate::decimal::{Percent, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Asset identifier (e.g., "bitcoin", "ethereum").
///
/// Stable across sources and time; unique within a page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for AssetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One row of the board.
///
/// Immutable value snapshot: merges and live deltas produce new records
/// instead of editing existing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub id: AssetId,
    /// Display order within the whole dataset (1 = largest market cap).
    pub rank: u32,
    pub symbol: String,
    pub name: String,
    pub price_usd: Price,
    pub market_cap_usd: Decimal,
    pub change_percent_24h: Percent,
    /// Present only when the enrichment source succeeded for the page.
    pub change_percent_7d: Option<Percent>,
    /// Present only when the enrichment source succeeded for the page.
    pub sparkline_7d: Option<Vec<Decimal>>,
}

impl MarketRecord {
    /// Whether the enrichment fields are set.
    pub fn is_enriched(&self) -> bool {
        self.change_percent_7d.is_some() && self.sparkline_7d.is_some()
    }

    /// New record carrying `price`, every other field copied.
    #[must_use]
    pub fn with_price(&self, price: Price) -> Self {
        Self {
            price_usd: price,
            ..self.clone()
        }
    }

    /// New record carrying enrichment fields, every other field copied.
    #[must_use]
    pub fn with_enrichment(self, change_percent_7d: Percent, sparkline_7d: Vec<Decimal>) -> Self {
        Self {
            change_percent_7d: Some(change_percent_7d),
            sparkline_7d: Some(sparkline_7d),
            ..self
        }
    }
}
