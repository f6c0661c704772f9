//! Live delta reconciliation.

use crate::error::FeedError;
use crate::page_store::{AppliedDeltas, PageStore};
use coinboard_core::{AssetId, ChangeDirection, ChangeEvent, Page, Price};
use coinboard_ws::SubscriptionHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Apply a delta map to `page`.
///
/// Every record whose id is in `deltas` is rebuilt with the new price; all
/// other records pass through untouched. A `ChangeEvent` is produced for
/// each record whose price actually moved. The revision is bumped only when
/// at least one price moved.
pub fn apply_deltas(page: &Page, deltas: &HashMap<AssetId, Price>) -> (Page, Vec<ChangeEvent>) {
    let mut events = Vec::new();
    let records = page
        .records
        .iter()
        .map(|record| match deltas.get(&record.id) {
            Some(&price) => {
                let direction = ChangeDirection::between(record.price_usd, price);
                if direction.is_none() {
                    return record.clone();
                }
                trace!(asset = %record.id, old = %record.price_usd, new = %price, %direction, "Price moved");
                events.push(ChangeEvent {
                    id: record.id.clone(),
                    direction,
                });
                record.with_price(price)
            }
            None => record.clone(),
        })
        .collect();

    let revision = if events.is_empty() {
        page.revision
    } else {
        page.revision + 1
    };

    let next = Page {
        index: page.index,
        size: page.size,
        total_count: page.total_count,
        generation: page.generation,
        revision,
        records,
    };
    (next, events)
}

/// Reconciler statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerStats {
    pub batches_applied: u64,
    pub stale_discarded: u64,
    pub change_events: u64,
}

/// Applies feed batches to a `PageStore`, counting outcomes.
#[derive(Debug, Default)]
pub struct Reconciler {
    batches_applied: AtomicU64,
    stale_discarded: AtomicU64,
    change_events: AtomicU64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one batch. Returns `None` when the batch was discarded as stale.
    pub fn reconcile(
        &self,
        store: &PageStore,
        handle: &SubscriptionHandle,
        deltas: &HashMap<AssetId, Price>,
    ) -> Option<AppliedDeltas> {
        match store.apply_deltas(handle, deltas) {
            Ok(applied) => {
                self.batches_applied.fetch_add(1, Ordering::Relaxed);
                self.change_events
                    .fetch_add(applied.events.len() as u64, Ordering::Relaxed);
                Some(applied)
            }
            Err(FeedError::StaleDeltaDiscarded {
                handle_generation,
                page_generation,
            }) => {
                self.stale_discarded.fetch_add(1, Ordering::Relaxed);
                debug!(
                    handle_generation,
                    page_generation,
                    deltas = deltas.len(),
                    "Stale delta batch discarded"
                );
                None
            }
            Err(e) => {
                debug!(error = %e, "Delta batch rejected");
                None
            }
        }
    }

    pub fn stats(&self) -> ReconcilerStats {
        ReconcilerStats {
            batches_applied: self.batches_applied.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
            change_events: self.change_events.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinboard_core::{MarketRecord, Percent};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(id: &str, rank: u32, price: Decimal) -> MarketRecord {
        MarketRecord {
            id: AssetId::from(id),
            rank,
            symbol: id.to_uppercase(),
            name: id.to_string(),
            price_usd: Price::new(price),
            market_cap_usd: dec!(1000),
            change_percent_24h: Percent::ZERO,
            change_percent_7d: Some(Percent::new(dec!(1.5))),
            sparkline_7d: Some(vec![dec!(1), dec!(2)]),
        }
    }

    fn page() -> Page {
        let mut page = Page::new(
            1,
            15,
            2296,
            vec![
                record("bitcoin", 1, dec!(100)),
                record("ethereum", 2, dec!(10)),
                record("tether", 3, dec!(1)),
            ],
        );
        page.generation = 5;
        page.revision = 2;
        page
    }

    fn deltas(list: &[(&str, Decimal)]) -> HashMap<AssetId, Price> {
        list.iter()
            .map(|(id, p)| (AssetId::from(*id), Price::new(*p)))
            .collect()
    }

    #[test]
    fn test_increase_and_decrease() {
        let old = page();
        let (new, events) = apply_deltas(&old, &deltas(&[("bitcoin", dec!(105)), ("ethereum", dec!(9.5))]));

        assert_eq!(new.get("bitcoin").unwrap().price_usd, Price::new(dec!(105)));
        assert_eq!(new.get("ethereum").unwrap().price_usd, Price::new(dec!(9.5)));
        assert_eq!(old.get("bitcoin").unwrap().price_usd, Price::new(dec!(100)));
        assert_eq!(events.len(), 2);
        assert!(events.contains(&ChangeEvent {
            id: AssetId::from("bitcoin"),
            direction: ChangeDirection::Increased
        }));
        assert!(events.contains(&ChangeEvent {
            id: AssetId::from("ethereum"),
            direction: ChangeDirection::Decreased
        }));
        assert_eq!(new.generation, 5);
        assert_eq!(new.revision, 3);
    }

    #[test]
    fn test_equal_price_emits_nothing() {
        let old = page();
        let (new, events) = apply_deltas(&old, &deltas(&[("bitcoin", dec!(100.00))]));

        assert!(events.is_empty());
        assert_eq!(new.records, old.records);
        assert_eq!(new.revision, old.revision);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let old = page();
        let (new, events) = apply_deltas(&old, &deltas(&[("solana", dec!(20))]));

        assert!(events.is_empty());
        assert_eq!(new.identifier_set(), old.identifier_set());
        assert_eq!(new.records, old.records);
    }

    #[test]
    fn test_other_fields_and_order_preserved() {
        let old = page();
        let (new, _) = apply_deltas(&old, &deltas(&[("ethereum", dec!(11))]));

        let order: Vec<_> = new.records.iter().map(|r| r.rank).collect();
        assert_eq!(order, vec![1, 2, 3]);
        let eth = new.get("ethereum").unwrap();
        assert_eq!(eth.change_percent_7d, Some(Percent::new(dec!(1.5))));
        assert_eq!(eth.sparkline_7d, Some(vec![dec!(1), dec!(2)]));
        assert_eq!(eth.market_cap_usd, dec!(1000));
    }

    #[test]
    fn test_reconciler_counts_stale_batches() {
        let store = PageStore::new(15, 2296);
        let current = store.replace_page(page());
        let reconciler = Reconciler::new();

        let live = SubscriptionHandle::new(current.generation, current.identifier_set());
        let stale = SubscriptionHandle::new(current.generation - 1, current.identifier_set());

        assert!(reconciler
            .reconcile(&store, &stale, &deltas(&[("bitcoin", dec!(1))]))
            .is_none());
        let applied = reconciler
            .reconcile(&store, &live, &deltas(&[("bitcoin", dec!(101))]))
            .unwrap();

        assert_eq!(applied.events.len(), 1);
        assert_eq!(
            reconciler.stats(),
            ReconcilerStats {
                batches_applied: 1,
                stale_discarded: 1,
                change_events: 1,
            }
        );
    }
}
