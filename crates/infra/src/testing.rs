//! Store double with injectable read failures and latency.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bloomstock_core::{BatchId, FlowerId};
use bloomstock_inventory::{Batch, Flower, LedgerEntry, NewLedgerEntry};

use crate::store::{InMemoryLedgerStore, LedgerStore, StoreError};

#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: InMemoryLedgerStore,
    failing: Mutex<HashSet<FlowerId>>,
    slow: Mutex<HashMap<FlowerId, Duration>>,
    catalog_down: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed_flower(&self, name: &str) -> Flower {
        let flower = Flower::new(FlowerId::new(), name, "cut");
        self.inner.upsert_flower(&flower).await.unwrap();
        flower
    }

    /// Ledger and batch reads for `id` fail with `Unavailable`.
    pub fn fail_reads_for(&self, id: FlowerId) {
        self.failing.lock().unwrap().insert(id);
    }

    /// Ledger reads for `id` sleep before answering.
    pub fn delay_reads_for(&self, id: FlowerId, delay: Duration) {
        self.slow.lock().unwrap().insert(id, delay);
    }

    pub fn take_catalog_down(&self) {
        self.catalog_down.store(true, Ordering::SeqCst);
    }

    async fn gate(&self, id: FlowerId) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(&id) {
            return Err(StoreError::Unavailable(format!("injected failure for {id}")));
        }
        let delay = self.slow.lock().unwrap().get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn list_flowers(&self) -> Result<Vec<Flower>, StoreError> {
        if self.catalog_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("catalog offline".into()));
        }
        self.inner.list_flowers().await
    }

    async fn get_flower(&self, id: FlowerId) -> Result<Flower, StoreError> {
        self.inner.get_flower(id).await
    }

    async fn upsert_flower(&self, flower: &Flower) -> Result<(), StoreError> {
        self.inner.upsert_flower(flower).await
    }

    async fn list_ledger_entries(
        &self,
        flower_id: FlowerId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        self.gate(flower_id).await?;
        self.inner.list_ledger_entries(flower_id, since).await
    }

    async fn append_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        self.inner.append_ledger_entry(entry).await
    }

    async fn get_batch(&self, id: BatchId) -> Result<Batch, StoreError> {
        self.inner.get_batch(id).await
    }

    async fn list_batches(&self, flower_id: FlowerId) -> Result<Vec<Batch>, StoreError> {
        self.gate(flower_id).await?;
        self.inner.list_batches(flower_id).await
    }

    async fn list_active_batches(&self, flower_id: FlowerId) -> Result<Vec<Batch>, StoreError> {
        self.gate(flower_id).await?;
        self.inner.list_active_batches(flower_id).await
    }

    async fn save_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        self.inner.save_batch(batch).await
    }

    async fn complete_inspection(
        &self,
        batch: &Batch,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, StoreError> {
        self.inner.complete_inspection(batch, entry).await
    }
}
