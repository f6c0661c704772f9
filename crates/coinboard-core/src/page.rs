//! Page snapshots.
//!
//! A `Page` is an immutable, fully formed view of one page of the board.
//! Every state transition (pagination or live delta) builds a new `Page`.

use crate::error::{CoreError, Result};
use crate::market::{AssetId, MarketRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: u32 = 15;

/// Default upper bound of listed assets, used to compute the page count.
pub const DEFAULT_TOTAL_COUNT: u32 = 2296;

/// One page of market records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// One-based page index (0 only for the initial empty page).
    pub index: u32,
    /// Fixed page length.
    pub size: u32,
    /// Known upper bound of records across all pages.
    pub total_count: u32,
    /// Assigned by the page store on every replacement.
    pub generation: u64,
    /// Incremented by every live delta applied within a generation.
    pub revision: u64,
    /// Records in rank order.
    pub records: Vec<MarketRecord>,
}

impl Page {
    pub fn new(index: u32, size: u32, total_count: u32, records: Vec<MarketRecord>) -> Self {
        Self {
            index,
            size,
            total_count,
            generation: 0,
            revision: 0,
            records,
        }
    }

    /// Page shown before the first fetch completes.
    pub fn empty(size: u32, total_count: u32) -> Self {
        Self::new(0, size, total_count, Vec::new())
    }

    /// Number of pages for this page's size and total count.
    pub fn page_count(&self) -> u32 {
        page_count(self.size, self.total_count)
    }

    /// Zero-based record offset of this page.
    pub fn offset(&self) -> u32 {
        page_offset(self.index, self.size)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Identifiers present on the page.
    pub fn identifier_set(&self) -> BTreeSet<AssetId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&MarketRecord> {
        self.records.iter().find(|r| r.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Whether every record carries enrichment fields.
    ///
    /// Returns `false` for an empty page.
    pub fn is_enriched(&self) -> bool {
        !self.records.is_empty() && self.records.iter().all(MarketRecord::is_enriched)
    }
}

/// Number of pages needed to list `total_count` records.
pub fn page_count(size: u32, total_count: u32) -> u32 {
    if size == 0 {
        return 0;
    }
    total_count.div_ceil(size)
}

/// Zero-based offset of a one-based page index.
pub fn page_offset(index: u32, size: u32) -> u32 {
    index.saturating_sub(1).saturating_mul(size)
}

/// Validate a one-based page index against the page count.
pub fn validate_page(index: u32, size: u32, total_count: u32) -> Result<()> {
    if size == 0 {
        return Err(CoreError::InvalidPageSize(size));
    }
    let count = page_count(size, total_count);
    if index == 0 || index > count {
        return Err(CoreError::InvalidPage {
            page: index,
            page_count: count,
        });
    }
    Ok(())
}
