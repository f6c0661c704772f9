//! Dual-source page fetch.

use crate::error::{RestError, RestResult};
use crate::merger::{MergedPage, Merger};
use crate::primary::PrimaryClient;
use crate::secondary::{Enrichment, SecondaryClient};
use coinboard_core::page::{page_offset, validate_page};
use coinboard_core::MarketRecord;
use tracing::{info, warn};

/// Normalized results of both sources for one page.
#[derive(Debug, Clone)]
pub struct NormalizedPair {
    pub page: u32,
    pub primary: Vec<MarketRecord>,
    /// `None` when the secondary query failed.
    pub secondary: Option<Vec<Enrichment>>,
    pub secondary_error: Option<String>,
}

/// Issues the primary and secondary queries for a page.
///
/// Performs network I/O only; owns no shared state.
pub struct PageFetcher {
    primary: PrimaryClient,
    secondary: SecondaryClient,
    merger: Merger,
    page_size: u32,
    total_count: u32,
}

impl PageFetcher {
    pub fn new(
        primary: PrimaryClient,
        secondary: SecondaryClient,
        merger: Merger,
        page_size: u32,
        total_count: u32,
    ) -> Self {
        Self {
            primary,
            secondary,
            merger,
            page_size,
            total_count,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    /// Fetch both sources for one-based `page` concurrently.
    ///
    /// A primary failure fails the whole page. A secondary failure is logged
    /// and reported as an absent secondary result.
    pub async fn fetch(&self, page: u32) -> RestResult<NormalizedPair> {
        validate_page(page, self.page_size, self.total_count)?;
        let offset = page_offset(page, self.page_size);

        let (primary, secondary) = tokio::join!(
            self.primary.fetch_assets(offset, self.page_size),
            self.secondary.fetch_markets(page, self.page_size),
        );

        let primary = primary.map_err(|e| RestError::PrimaryFetchFailed {
            page,
            reason: e.to_string(),
        })?;

        let (secondary, secondary_error) = match secondary {
            Ok(markets) => (Some(markets), None),
            Err(e) => {
                let err = RestError::SecondaryFetchFailed {
                    page,
                    reason: e.to_string(),
                };
                warn!(page, error = %err, "Secondary fetch failed, page will be unenriched");
                (None, Some(err.to_string()))
            }
        };

        Ok(NormalizedPair {
            page,
            primary,
            secondary,
            secondary_error,
        })
    }

    /// Fetch and merge one-based `page`.
    pub async fn fetch_merged(&self, page: u32) -> RestResult<MergedPage> {
        let pair = self.fetch(page).await?;
        let merged = self.merger.merge(pair.primary, pair.secondary);
        info!(
            page,
            rows = merged.records.len(),
            enriched = merged.report.enriched,
            misaligned = merged.report.misaligned,
            "Page fetched"
        );
        Ok(merged)
    }
}
