//! Primary market snapshot client.
//!
//! Fetches one page of assets from a CoinCap-compatible `/assets` endpoint
//! (`offset`/`limit` pagination) and normalizes each entry into an
//! unenriched `MarketRecord`.

use crate::error::{RestError, RestResult};
use coinboard_core::{AssetId, MarketRecord, Percent, Price};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Primary source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryConfig {
    /// API base URL (e.g., "https://api.coincap.io/v2").
    #[serde(default = "default_primary_base_url")]
    pub base_url: String,
    /// Optional API key, sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout (ms).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_primary_base_url() -> String {
    "https://api.coincap.io/v2".to_string()
}

pub(crate) fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            base_url: default_primary_base_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Envelope of the `/assets` response.
#[derive(Debug, Deserialize)]
struct AssetsResponse {
    data: Vec<RawAsset>,
}

/// Raw asset entry. Numeric fields arrive as decimal strings.
#[derive(Debug, Deserialize)]
struct RawAsset {
    id: String,
    rank: Numeric,
    symbol: String,
    name: String,
    #[serde(rename = "priceUsd", default)]
    price_usd: Option<Numeric>,
    #[serde(rename = "marketCapUsd", default)]
    market_cap_usd: Option<Numeric>,
    #[serde(rename = "changePercent24Hr", default)]
    change_percent_24h: Option<Numeric>,
}

/// A numeric field sent either as a JSON string or a JSON number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Text(String),
    Number(serde_json::Number),
}

impl Numeric {
    fn to_decimal(&self) -> Result<Decimal, String> {
        let text = match self {
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        };
        parse_decimal(&text).map_err(|e| format!("{text:?}: {e}"))
    }
}

/// Parse plain or scientific decimal notation.
pub(crate) fn parse_decimal(s: &str) -> Result<Decimal, rust_decimal::Error> {
    let s = s.trim();
    s.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(s))
}

/// Missing numeric fields normalize to zero so the page keeps its length.
fn optional_decimal(field: &Option<Numeric>, id: &str, name: &str) -> RestResult<Decimal> {
    match field {
        Some(value) => value
            .to_decimal()
            .map_err(|e| RestError::ParseError(format!("{id}.{name}: {e}"))),
        None => {
            debug!(asset = %id, field = name, "Missing numeric field, using zero");
            Ok(Decimal::ZERO)
        }
    }
}

impl RawAsset {
    fn normalize(self) -> RestResult<MarketRecord> {
        let rank_value = self
            .rank
            .to_decimal()
            .map_err(|e| RestError::ParseError(format!("{}.rank: {e}", self.id)))?;
        let rank = rank_value
            .to_u32()
            .filter(|r| *r > 0 && rank_value.fract().is_zero())
            .ok_or_else(|| {
                RestError::ParseError(format!("{}.rank: not a positive integer", self.id))
            })?;

        let price = optional_decimal(&self.price_usd, &self.id, "priceUsd")?;
        let market_cap = optional_decimal(&self.market_cap_usd, &self.id, "marketCapUsd")?;
        let change_24h = optional_decimal(&self.change_percent_24h, &self.id, "changePercent24Hr")?;

        Ok(MarketRecord {
            id: AssetId::new(self.id),
            rank,
            symbol: self.symbol,
            name: self.name,
            price_usd: Price::new(price),
            market_cap_usd: market_cap,
            change_percent_24h: Percent::new(change_24h),
            change_percent_7d: None,
            sparkline_7d: None,
        })
    }
}

/// Normalize a response body, keeping the first entry for each id.
fn normalize_assets(data: Vec<RawAsset>) -> RestResult<Vec<MarketRecord>> {
    let mut seen = HashSet::with_capacity(data.len());
    let mut records = Vec::with_capacity(data.len());
    for raw in data {
        let record = raw.normalize()?;
        if !seen.insert(record.id.clone()) {
            warn!(asset = %record.id, rank = record.rank, "Duplicate asset id dropped");
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

/// Client for the primary market snapshot source.
pub struct PrimaryClient {
    client: Client,
    config: PrimaryConfig,
}

impl PrimaryClient {
    /// Create a new primary client.
    pub fn new(config: PrimaryConfig) -> RestResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RestError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Fetch `limit` assets starting at zero-based `offset`, in rank order.
    pub async fn fetch_assets(&self, offset: u32, limit: u32) -> RestResult<Vec<MarketRecord>> {
        let url = format!("{}/assets", self.config.base_url.trim_end_matches('/'));
        debug!(%url, offset, limit, "Fetching primary assets");

        let mut request = self
            .client
            .get(&url)
            .query(&[("offset", offset), ("limit", limit)]);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RestError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RestError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: AssetsResponse = response
            .json()
            .await
            .map_err(|e| RestError::ParseError(format!("Failed to parse assets response: {e}")))?;

        let records = normalize_assets(body.data)?;

        info!(offset, count = records.len(), "Fetched primary assets");
        Ok(records)
    }
}
