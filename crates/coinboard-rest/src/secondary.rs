//! Secondary enrichment client.
//!
//! Fetches 7-day change and sparkline samples from a CoinGecko-compatible
//! `/coins/markets` endpoint. Results are ordered by market cap, like the
//! primary source, but identifiers are not guaranteed to agree.

use crate::error::{RestError, RestResult};
use crate::primary::default_timeout_ms;
use coinboard_core::{AssetId, Percent};
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Header carrying the optional API key.
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Secondary source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryConfig {
    /// API base URL (e.g., "https://api.coingecko.com/api/v3").
    #[serde(default = "default_secondary_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout (ms).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_secondary_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            base_url: default_secondary_base_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Enrichment fields for one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub id: AssetId,
    pub symbol: String,
    /// `None` when the source did not report it.
    pub change_percent_7d: Option<Percent>,
    pub sparkline_7d: Vec<Decimal>,
}

#[derive(Debug, Deserialize)]
struct RawMarket {
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    price_change_percentage_7d_in_currency: Option<f64>,
    #[serde(default)]
    sparkline_in_7d: Option<RawSparkline>,
}

#[derive(Debug, Deserialize)]
struct RawSparkline {
    #[serde(default)]
    price: Vec<Option<f64>>,
}

impl RawMarket {
    fn normalize(self) -> Enrichment {
        let change = self
            .price_change_percentage_7d_in_currency
            .and_then(Decimal::from_f64)
            .map(Percent::new);
        if change.is_none() {
            debug!(asset = %self.id, "Missing 7d change");
        }

        let sparkline = self
            .sparkline_in_7d
            .map(|s| {
                s.price
                    .into_iter()
                    .flatten()
                    .filter_map(Decimal::from_f64)
                    .collect()
            })
            .unwrap_or_default();

        Enrichment {
            id: AssetId::new(self.id),
            symbol: self.symbol,
            change_percent_7d: change,
            sparkline_7d: sparkline,
        }
    }
}

/// Client for the secondary enrichment source.
pub struct SecondaryClient {
    client: Client,
    config: SecondaryConfig,
}

impl SecondaryClient {
    pub fn new(config: SecondaryConfig) -> RestResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RestError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Fetch enrichment for one-based `page` of `per_page` entries.
    pub async fn fetch_markets(&self, page: u32, per_page: u32) -> RestResult<Vec<Enrichment>> {
        let url = format!(
            "{}/coins/markets",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(%url, page, per_page, "Fetching secondary markets");

        let per_page = per_page.to_string();
        let page_param = page.to_string();
        let mut request = self.client.get(&url).query(&[
            ("vs_currency", "usd"),
            ("order", "market_cap_desc"),
            ("per_page", per_page.as_str()),
            ("page", page_param.as_str()),
            ("sparkline", "true"),
            ("price_change_percentage", "7d"),
        ]);
        if let Some(key) = &self.config.api_key {
            request = request.header(API_KEY_HEADER, key);
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

        let markets: Vec<RawMarket> = response
            .json()
            .await
            .map_err(|e| RestError::ParseError(format!("Failed to parse markets response: {e}")))?;

        let enrichments: Vec<Enrichment> =
            markets.into_iter().map(RawMarket::normalize).collect();

        info!(page, count = enrichments.len(), "Fetched secondary markets");
        Ok(enrichments)
    }
}
