//! Subscription handles.
//!
//! A handle names the page generation a subscription was opened for and the
//! exact identifier set it streams. Deltas carry their handle so stale
//! batches can be recognized after a page replacement.

use coinboard_core::{AssetId, Page};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Identifies one streaming subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    generation: u64,
    assets: Arc<BTreeSet<AssetId>>,
}

impl SubscriptionHandle {
    pub fn new(generation: u64, assets: BTreeSet<AssetId>) -> Self {
        Self {
            generation,
            assets: Arc::new(assets),
        }
    }

    /// Page generation this subscription is scoped to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn assets(&self) -> &BTreeSet<AssetId> {
        &self.assets
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Whether this handle still describes `page`: same generation and the
    /// same identifier set.
    pub fn matches_page(&self, page: &Page) -> bool {
        self.generation == page.generation && *self.assets == page.identifier_set()
    }

    /// Streaming URL for this subscription.
    pub fn feed_url(&self, base: &str, api_key: Option<&str>) -> String {
        let assets = self
            .assets
            .iter()
            .map(AssetId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let separator = if base.contains('?') { '&' } else { '?' };
        let mut url = format!("{base}{separator}assets={assets}");
        if let Some(key) = api_key {
            url.push_str("&apiKey=");
            url.push_str(key);
        }
        url
    }
}
