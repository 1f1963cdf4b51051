use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bloomstock_core::{BatchId, FlowerId, LedgerEntryId};
use bloomstock_inventory::{Batch, BatchState, Flower, LedgerEntry, NewLedgerEntry};

use super::r#trait::{LedgerStore, StoreError};

#[derive(Debug, Default)]
struct State {
    flowers: HashMap<FlowerId, Flower>,
    batches: HashMap<BatchId, Batch>,
    ledger: HashMap<FlowerId, Vec<LedgerEntry>>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. Reads clone out of the lock so concurrent workers
/// never hold it across an await point.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<R>(&self, f: impl FnOnce(&State) -> Result<R, StoreError>) -> Result<R, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        f(&state)
    }

    fn write<R>(&self, f: impl FnOnce(&mut State) -> Result<R, StoreError>) -> Result<R, StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        f(&mut state)
    }

    fn append_locked(state: &mut State, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        if !state.flowers.contains_key(&entry.flower_id) {
            return Err(StoreError::flower_not_found(entry.flower_id));
        }
        if let Some(batch_id) = entry.batch_id {
            if !state.batches.contains_key(&batch_id) {
                return Err(StoreError::batch_not_found(batch_id));
            }
        }
        let committed = entry.commit(LedgerEntryId::new())?;
        let stream = state.ledger.entry(committed.flower_id).or_default();
        // Keep the stream ordered by occurrence; equal timestamps keep append order.
        let at = stream.partition_point(|e| e.occurred_at <= committed.occurred_at);
        stream.insert(at, committed.clone());
        Ok(committed)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn list_flowers(&self) -> Result<Vec<Flower>, StoreError> {
        self.read(|s| {
            let mut flowers: Vec<Flower> = s.flowers.values().cloned().collect();
            flowers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
            Ok(flowers)
        })
    }

    async fn get_flower(&self, id: FlowerId) -> Result<Flower, StoreError> {
        self.read(|s| {
            s.flowers
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::flower_not_found(id))
        })
    }

    async fn upsert_flower(&self, flower: &Flower) -> Result<(), StoreError> {
        flower.validate()?;
        self.write(|s| {
            s.flowers.insert(flower.id, flower.clone());
            Ok(())
        })
    }

    async fn list_ledger_entries(
        &self,
        flower_id: FlowerId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        self.read(|s| {
            let Some(stream) = s.ledger.get(&flower_id) else {
                return Ok(Vec::new());
            };
            Ok(match since {
                Some(since) => stream
                    .iter()
                    .filter(|e| e.occurred_at >= since)
                    .cloned()
                    .collect(),
                None => stream.clone(),
            })
        })
    }

    async fn append_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        self.write(|s| Self::append_locked(s, entry))
    }

    async fn get_batch(&self, id: BatchId) -> Result<Batch, StoreError> {
        self.read(|s| {
            s.batches
                .get(&id)
                .cloned()
                .ok_or_else(|| StoreError::batch_not_found(id))
        })
    }

    async fn list_batches(&self, flower_id: FlowerId) -> Result<Vec<Batch>, StoreError> {
        self.read(|s| {
            let mut batches: Vec<Batch> = s
                .batches
                .values()
                .filter(|b| b.flower_id == flower_id)
                .cloned()
                .collect();
            batches.sort_by(|a, b| a.received_at.cmp(&b.received_at).then_with(|| a.id.cmp(&b.id)));
            Ok(batches)
        })
    }

    async fn list_active_batches(&self, flower_id: FlowerId) -> Result<Vec<Batch>, StoreError> {
        let mut batches = self.list_batches(flower_id).await?;
        batches.retain(|b| b.state == BatchState::Active);
        Ok(batches)
    }

    async fn save_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        self.write(|s| {
            if !s.flowers.contains_key(&batch.flower_id) {
                return Err(StoreError::flower_not_found(batch.flower_id));
            }
            s.batches.insert(batch.id, batch.clone());
            Ok(())
        })
    }

    async fn complete_inspection(
        &self,
        batch: &Batch,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, StoreError> {
        StoreError::check_inspection_entry(batch, &entry)?;
        self.write(|s| {
            match s.batches.get(&batch.id) {
                None => return Err(StoreError::batch_not_found(batch.id)),
                Some(stored) if stored.state != BatchState::Received => {
                    return Err(StoreError::already_inspected(batch.id));
                }
                Some(_) => {}
            }
            // Append first: it validates, and nothing has changed if it fails.
            let committed = Self::append_locked(s, entry)?;
            s.batches.insert(batch.id, batch.clone());
            Ok(committed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, day, 10, 0, 0).unwrap()
    }

    async fn seeded() -> (InMemoryLedgerStore, Flower) {
        let store = InMemoryLedgerStore::new();
        let flower = Flower::new(FlowerId::new(), "Lily", "cut");
        store.upsert_flower(&flower).await.unwrap();
        (store, flower)
    }

    #[tokio::test]
    async fn entries_are_returned_in_occurrence_order() {
        let (store, flower) = seeded().await;
        for day in [5, 2, 9] {
            store
                .append_ledger_entry(NewLedgerEntry::adjustment(flower.id, 1, at(day), "count"))
                .await
                .unwrap();
        }

        let all = store.list_ledger_entries(flower.id, None).await.unwrap();
        let days: Vec<_> = all.iter().map(|e| e.occurred_at).collect();
        assert_eq!(days, vec![at(2), at(5), at(9)]);

        let recent = store.list_ledger_entries(flower.id, Some(at(5))).await.unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn append_rejects_unknown_flower_and_bad_sign() {
        let (store, flower) = seeded().await;

        let err = store
            .append_ledger_entry(NewLedgerEntry::adjustment(FlowerId::new(), 1, at(1), "count"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "flower", .. }));

        let mut bad = NewLedgerEntry::outbound(flower.id, 3, at(1), "sale");
        bad.delta = 3;
        let err = store.append_ledger_entry(bad).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[tokio::test]
    async fn failed_inspection_write_leaves_batch_untouched() {
        let (store, flower) = seeded().await;
        let batch = Batch::receive(BatchId::new(), flower.id, 10, at(1), 7).unwrap();
        store.save_batch(&batch).await.unwrap();

        let mut inspected = batch.clone();
        inspected.inspect(8, "fine", at(1) + Duration::hours(2)).unwrap();
        let empty_reason = NewLedgerEntry::inbound(flower.id, Some(batch.id), 8, at(1), " ");

        assert!(store.complete_inspection(&inspected, empty_reason).await.is_err());
        assert_eq!(store.get_batch(batch.id).await.unwrap().state, BatchState::Received);
        assert!(store.list_ledger_entries(flower.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_second_inspection_is_rejected_without_a_second_entry() {
        let (store, flower) = seeded().await;
        let batch = Batch::receive(BatchId::new(), flower.id, 50, at(1), 7).unwrap();
        store.save_batch(&batch).await.unwrap();

        // Both writers read the batch while it is still `Received`.
        let mut first = store.get_batch(batch.id).await.unwrap();
        let mut second = store.get_batch(batch.id).await.unwrap();
        first.inspect(40, "ok", at(2)).unwrap();
        second.inspect(40, "ok", at(2)).unwrap();
        let entry = || NewLedgerEntry::inbound(flower.id, Some(batch.id), 40, at(2), "inspection passed");

        store.complete_inspection(&first, entry()).await.unwrap();
        let err = store.complete_inspection(&second, entry()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(bloomstock_core::DomainError::InvariantViolation(_))
        ));

        let entries = store.list_ledger_entries(flower.id, None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.iter().map(|e| e.delta).sum::<i64>(), 40);
    }

    #[tokio::test]
    async fn inspection_entry_must_reference_the_batch() {
        let (store, flower) = seeded().await;
        let batch = Batch::receive(BatchId::new(), flower.id, 10, at(1), 7).unwrap();
        store.save_batch(&batch).await.unwrap();

        let mut inspected = batch.clone();
        inspected.inspect(8, "fine", at(2)).unwrap();
        let unlinked = NewLedgerEntry::inbound(flower.id, None, 8, at(2), "inspection passed");

        let err = store.complete_inspection(&inspected, unlinked).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(bloomstock_core::DomainError::Validation { ref field, .. })
                if field == "batch_id"
        ));
        assert_eq!(store.get_batch(batch.id).await.unwrap().state, BatchState::Received);
    }
}
