//! Stock aggregator: the canonical on-hand figure.
//!
//! Stock is the signed sum of every ledger delta for a flower, clamped at zero.
//! Batch quantities are never consulted here.

use tracing::warn;

use bloomstock_core::FlowerId;
use bloomstock_inventory::LedgerEntry;

use crate::store::LedgerStore;

/// Reduce a ledger slice to a non-negative stock level.
pub fn reduce_stock<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> u64 {
    let net: i128 = entries.into_iter().map(|e| i128::from(e.delta)).sum();
    u64::try_from(net.max(0)).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone)]
pub struct StockAggregator<S> {
    store: S,
}

impl<S> StockAggregator<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current stock for one flower.
    ///
    /// Fails soft: a read error is logged and reported as zero stock.
    pub async fn current_stock(&self, flower_id: FlowerId) -> u64 {
        match self.store.list_ledger_entries(flower_id, None).await {
            Ok(entries) => reduce_stock(&entries),
            Err(e) => {
                warn!(flower_id = %flower_id, error = ?e, "ledger read failed; reporting zero stock");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    use bloomstock_core::LedgerEntryId;
    use bloomstock_inventory::{Flower, NewLedgerEntry};

    use crate::store::InMemoryLedgerStore;
    use crate::testing::FaultyStore;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()
    }

    fn entry(flower: FlowerId, delta: i64) -> LedgerEntry {
        NewLedgerEntry::adjustment(flower, delta, at(), "count")
            .commit(LedgerEntryId::new())
            .unwrap()
    }

    #[test]
    fn net_negative_ledger_reports_zero() {
        let f = FlowerId::new();
        assert_eq!(reduce_stock(&[entry(f, 5), entry(f, -12)]), 0);
        assert_eq!(reduce_stock(&[entry(f, 5), entry(f, -2)]), 3);
        assert_eq!(reduce_stock(&Vec::<LedgerEntry>::new()), 0);
    }

    proptest! {
        /// Property: stock is never negative and equals the clamped sum.
        #[test]
        fn stock_is_clamped_sum(deltas in prop::collection::vec(
            (-1_000i64..1_000).prop_filter("non-zero", |d| *d != 0), 0..50)
        ) {
            let f = FlowerId::new();
            let entries: Vec<_> = deltas.iter().map(|d| entry(f, *d)).collect();
            let expected = deltas.iter().sum::<i64>().max(0) as u64;
            prop_assert_eq!(reduce_stock(&entries), expected);
        }
    }

    #[tokio::test]
    async fn reads_through_the_store() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let flower = Flower::new(FlowerId::new(), "Iris", "cut");
        store.upsert_flower(&flower).await.unwrap();
        store
            .append_ledger_entry(NewLedgerEntry::inbound(flower.id, None, 30, at(), "receipt"))
            .await
            .unwrap();
        store
            .append_ledger_entry(NewLedgerEntry::outbound(flower.id, 12, at(), "sale"))
            .await
            .unwrap();

        let aggregator = StockAggregator::new(store);
        assert_eq!(aggregator.current_stock(flower.id).await, 18);
    }

    #[tokio::test]
    async fn read_failure_fails_soft_to_zero() {
        let store = Arc::new(FaultyStore::new());
        let flower = store.seed_flower("Aster").await;
        store
            .append_ledger_entry(NewLedgerEntry::inbound(flower.id, None, 9, at(), "receipt"))
            .await
            .unwrap();
        store.fail_reads_for(flower.id);

        let aggregator = StockAggregator::new(store);
        assert_eq!(aggregator.current_stock(flower.id).await, 0);
    }
}
