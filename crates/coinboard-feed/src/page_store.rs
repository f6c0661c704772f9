//! Current page ownership.
//!
//! Readers get an `Arc<Page>` and never observe a partially updated page:
//! every mutation builds a new page and swaps the pointer.

use crate::error::{FeedError, FeedResult};
use crate::reconciler;
use coinboard_core::{AssetId, ChangeEvent, Page, Price};
use coinboard_ws::SubscriptionHandle;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Result of a delta batch that passed the staleness guard.
#[derive(Debug, Clone)]
pub struct AppliedDeltas {
    pub page: Arc<Page>,
    pub events: Vec<ChangeEvent>,
}

/// Holds the displayed page.
#[derive(Debug)]
pub struct PageStore {
    current: RwLock<Arc<Page>>,
    next_generation: AtomicU64,
}

impl PageStore {
    /// Start with an empty page (index 0, generation 0).
    pub fn new(page_size: u32, total_count: u32) -> Self {
        Self {
            current: RwLock::new(Arc::new(Page::empty(page_size, total_count))),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Swap in a new page, assigning it the next generation.
    ///
    /// This is the only pagination entry point.
    pub fn replace_page(&self, mut page: Page) -> Arc<Page> {
        page.generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        page.revision = 0;
        let page = Arc::new(page);
        *self.current.write() = page.clone();
        debug!(
            index = page.index,
            generation = page.generation,
            rows = page.len(),
            "Page replaced"
        );
        page
    }

    /// The current immutable snapshot.
    pub fn current_page(&self) -> Arc<Page> {
        self.current.read().clone()
    }

    /// Apply a delta batch received on `handle`.
    ///
    /// The batch is discarded in full when `handle` no longer describes the
    /// current page.
    pub fn apply_deltas(
        &self,
        handle: &SubscriptionHandle,
        deltas: &HashMap<AssetId, Price>,
    ) -> FeedResult<AppliedDeltas> {
        let mut current = self.current.write();
        if !handle.matches_page(&current) {
            return Err(FeedError::StaleDeltaDiscarded {
                handle_generation: handle.generation(),
                page_generation: current.generation,
            });
        }

        let (next, events) = reconciler::apply_deltas(&current, deltas);
        if !events.is_empty() {
            *current = Arc::new(next);
        }
        Ok(AppliedDeltas {
            page: current.clone(),
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinboard_core::{MarketRecord, Percent};
    use rust_decimal_macros::dec;

    fn page(index: u32, ids: &[&str]) -> Page {
        let records = ids
            .iter()
            .enumerate()
            .map(|(i, id)| MarketRecord {
                id: AssetId::from(*id),
                rank: i as u32 + 1,
                symbol: id.to_uppercase(),
                name: id.to_string(),
                price_usd: Price::new(dec!(100)),
                market_cap_usd: dec!(1),
                change_percent_24h: Percent::ZERO,
                change_percent_7d: None,
                sparkline_7d: None,
            })
            .collect();
        Page::new(index, 15, 2296, records)
    }

    fn handle_for(page: &Page) -> SubscriptionHandle {
        SubscriptionHandle::new(page.generation, page.identifier_set())
    }

    #[test]
    fn test_initial_page_is_empty() {
        let store = PageStore::new(15, 2296);
        let page = store.current_page();
        assert!(page.is_empty());
        assert_eq!(page.generation, 0);
    }

    #[test]
    fn test_replace_assigns_increasing_generations() {
        let store = PageStore::new(15, 2296);
        let first = store.replace_page(page(1, &["bitcoin"]));
        let second = store.replace_page(page(2, &["solana"]));

        assert_eq!(first.generation, 1);
        assert_eq!(second.generation, 2);
        assert_eq!(store.current_page().index, 2);
    }

    #[test]
    fn test_apply_swaps_snapshot_without_touching_readers() {
        let store = PageStore::new(15, 2296);
        let current = store.replace_page(page(1, &["bitcoin", "ethereum"]));
        let held = store.current_page();

        let deltas = HashMap::from([(AssetId::from("bitcoin"), Price::new(dec!(105)))]);
        let applied = store.apply_deltas(&handle_for(&current), &deltas).unwrap();

        assert_eq!(applied.page.revision, 1);
        assert_eq!(
            store.current_page().get("bitcoin").unwrap().price_usd,
            Price::new(dec!(105))
        );
        assert_eq!(held.get("bitcoin").unwrap().price_usd, Price::new(dec!(100)));
    }

    #[test]
    fn test_deltas_for_superseded_page_are_discarded() {
        let store = PageStore::new(15, 2296);
        let page1 = store.replace_page(page(1, &["bitcoin"]));
        let old_handle = handle_for(&page1);
        store.replace_page(page(2, &["bitcoin"]));

        let deltas = HashMap::from([(AssetId::from("bitcoin"), Price::new(dec!(1)))]);
        let result = store.apply_deltas(&old_handle, &deltas);

        assert!(matches!(
            result,
            Err(FeedError::StaleDeltaDiscarded {
                handle_generation: 1,
                page_generation: 2
            })
        ));
        assert_eq!(
            store.current_page().get("bitcoin").unwrap().price_usd,
            Price::new(dec!(100))
        );
    }

    #[test]
    fn test_own_handle_applies_when_page_repeats_an_id() {
        let store = PageStore::new(15, 2296);
        let current = store.replace_page(page(1, &["bitcoin", "ethereum", "ethereum"]));

        let deltas = HashMap::from([(AssetId::from("bitcoin"), Price::new(dec!(105)))]);
        let applied = store.apply_deltas(&handle_for(&current), &deltas).unwrap();

        assert_eq!(applied.events.len(), 1);
        assert_eq!(
            store.current_page().get("bitcoin").unwrap().price_usd,
            Price::new(dec!(105))
        );
    }
}
