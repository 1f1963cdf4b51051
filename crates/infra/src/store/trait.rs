use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bloomstock_core::{BatchId, DomainError, FlowerId};
use bloomstock_inventory::{Batch, Flower, LedgerEntry, NewLedgerEntry};

/// Ledger/batch store operation error.
///
/// These are **infrastructure errors**. Validation failures raised while
/// committing an entry are carried through as `Rejected`.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation timed out: {0}")]
    Timeout(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("rejected: {0}")]
    Rejected(#[from] DomainError),
}

impl StoreError {
    pub fn flower_not_found(id: FlowerId) -> Self {
        Self::NotFound {
            entity: "flower",
            id: id.to_string(),
        }
    }

    pub fn batch_not_found(id: BatchId) -> Self {
        Self::NotFound {
            entity: "batch",
            id: id.to_string(),
        }
    }

    /// The stored batch has left `Received`; a second inspection must not land.
    pub fn already_inspected(id: BatchId) -> Self {
        Self::Rejected(DomainError::invariant(format!(
            "batch {id} has already been inspected"
        )))
    }

    pub(crate) fn check_inspection_entry(
        batch: &Batch,
        entry: &NewLedgerEntry,
    ) -> Result<(), StoreError> {
        if entry.batch_id != Some(batch.id) || entry.flower_id != batch.flower_id {
            return Err(Self::Rejected(DomainError::validation(
                "batch_id",
                format!("inspection entry does not reference batch {}", batch.id),
            )));
        }
        Ok(())
    }
}

/// Source of truth for flowers, batches and the append-only stock ledger.
///
/// ## Read semantics
///
/// Every read returns owned data; implementations never hand out a shared
/// mutable session. Concurrent callers (the parallel snapshot pass) each get
/// an isolated read, either a pooled connection or a cloned view.
///
/// ## Write semantics
///
/// Ledger entries are immutable once appended. Entries appended here are
/// visible to every subsequent read.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn list_flowers(&self) -> Result<Vec<Flower>, StoreError>;

    async fn get_flower(&self, id: FlowerId) -> Result<Flower, StoreError>;

    /// Insert or replace a catalog row.
    async fn upsert_flower(&self, flower: &Flower) -> Result<(), StoreError>;

    /// Entries for one flower ordered by `occurred_at`, optionally from `since` on.
    async fn list_ledger_entries(
        &self,
        flower_id: FlowerId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Validate and append one entry.
    async fn append_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError>;

    async fn get_batch(&self, id: BatchId) -> Result<Batch, StoreError>;

    async fn list_batches(&self, flower_id: FlowerId) -> Result<Vec<Batch>, StoreError>;

    /// Batches in the `Active` lifecycle state.
    async fn list_active_batches(&self, flower_id: FlowerId) -> Result<Vec<Batch>, StoreError>;

    /// Insert or replace a batch row.
    async fn save_batch(&self, batch: &Batch) -> Result<(), StoreError>;

    /// Persist an inspected batch together with its inbound ledger entry.
    ///
    /// Either both writes land or neither does.
    async fn complete_inspection(
        &self,
        batch: &Batch,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn list_flowers(&self) -> Result<Vec<Flower>, StoreError> {
        (**self).list_flowers().await
    }

    async fn get_flower(&self, id: FlowerId) -> Result<Flower, StoreError> {
        (**self).get_flower(id).await
    }

    async fn upsert_flower(&self, flower: &Flower) -> Result<(), StoreError> {
        (**self).upsert_flower(flower).await
    }

    async fn list_ledger_entries(
        &self,
        flower_id: FlowerId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).list_ledger_entries(flower_id, since).await
    }

    async fn append_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        (**self).append_ledger_entry(entry).await
    }

    async fn get_batch(&self, id: BatchId) -> Result<Batch, StoreError> {
        (**self).get_batch(id).await
    }

    async fn list_batches(&self, flower_id: FlowerId) -> Result<Vec<Batch>, StoreError> {
        (**self).list_batches(flower_id).await
    }

    async fn list_active_batches(&self, flower_id: FlowerId) -> Result<Vec<Batch>, StoreError> {
        (**self).list_active_batches(flower_id).await
    }

    async fn save_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        (**self).save_batch(batch).await
    }

    async fn complete_inspection(
        &self,
        batch: &Batch,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, StoreError> {
        (**self).complete_inspection(batch, entry).await
    }
}
