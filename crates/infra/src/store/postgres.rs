//! Postgres-backed ledger store.
//!
//! ## Read isolation
//!
//! Every read runs on a connection checked out of the `PgPool` for that one
//! query. Parallel snapshot workers therefore never share a session.
//!
//! ## Error mapping
//!
//! | SQLx error | `StoreError` |
//! |---|---|
//! | `PoolTimedOut` | `Timeout` |
//! | `PoolClosed`, `Io`, `Tls`, other | `Unavailable` |
//! | `Database` (check / FK violation `23514` / `23503`) | `Corrupt` |
//! | `ColumnDecode`, `Decode`, `ColumnNotFound` | `Corrupt` |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use bloomstock_core::{BatchId, FlowerId, LedgerEntryId};
use bloomstock_inventory::{
    AbcClass, Batch, BatchState, Flower, LedgerEntry, LedgerKind, NewLedgerEntry,
};

use super::r#trait::{LedgerStore, StoreError};

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const FLOWER_COLUMNS: &str = "id, name, category, abc_class, shelf_life_days, unit_price, \
     seasonal_factor, pass_rate, lead_time_days, review_cycle_days";

const BATCH_COLUMNS: &str = "id, flower_id, quantity_received, quantity_passed, received_at, \
     expires_at, state, inspected_at, inspection_note";

const LEDGER_COLUMNS: &str = "id, flower_id, batch_id, delta, kind, occurred_at, reason";

#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool. `acquire_timeout` bounds how long a worker waits for a connection.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables, indexes and the append-only trigger if missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self), fields(flower_count), err)]
    async fn list_flowers(&self) -> Result<Vec<Flower>, StoreError> {
        let rows = sqlx::query(&format!("SELECT {FLOWER_COLUMNS} FROM flowers ORDER BY name, id"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_flowers", e))?;

        Span::current().record("flower_count", rows.len());
        rows.iter().map(flower_from_row).collect()
    }

    #[instrument(skip(self), fields(flower_id = %id), err)]
    async fn get_flower(&self, id: FlowerId) -> Result<Flower, StoreError> {
        let row = sqlx::query(&format!("SELECT {FLOWER_COLUMNS} FROM flowers WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_flower", e))?;

        match row {
            Some(row) => flower_from_row(&row),
            None => Err(StoreError::flower_not_found(id)),
        }
    }

    #[instrument(skip(self, flower), fields(flower_id = %flower.id), err)]
    async fn upsert_flower(&self, flower: &Flower) -> Result<(), StoreError> {
        flower.validate()?;
        sqlx::query(
            r#"
            INSERT INTO flowers (
                id, name, category, abc_class, shelf_life_days, unit_price,
                seasonal_factor, pass_rate, lead_time_days, review_cycle_days
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                abc_class = EXCLUDED.abc_class,
                shelf_life_days = EXCLUDED.shelf_life_days,
                unit_price = EXCLUDED.unit_price,
                seasonal_factor = EXCLUDED.seasonal_factor,
                pass_rate = EXCLUDED.pass_rate,
                lead_time_days = EXCLUDED.lead_time_days,
                review_cycle_days = EXCLUDED.review_cycle_days
            "#,
        )
        .bind(*flower.id.as_uuid())
        .bind(&flower.name)
        .bind(&flower.category)
        .bind(flower.abc_class.map(|c| c.as_str()))
        .bind(to_i32("shelf_life_days", flower.shelf_life_days)?)
        .bind(flower.unit_price)
        .bind(flower.seasonal_factor)
        .bind(flower.pass_rate)
        .bind(to_i32("lead_time_days", flower.lead_time_days)?)
        .bind(to_i32("review_cycle_days", flower.review_cycle_days)?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_flower", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(flower_id = %flower_id, entry_count), err)]
    async fn list_ledger_entries(
        &self,
        flower_id: FlowerId,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {LEDGER_COLUMNS}
            FROM ledger_entries
            WHERE flower_id = $1 AND ($2::timestamptz IS NULL OR occurred_at >= $2)
            ORDER BY occurred_at ASC, seq ASC
            "#
        ))
        .bind(*flower_id.as_uuid())
        .bind(since)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_ledger_entries", e))?;

        Span::current().record("entry_count", rows.len());
        rows.iter().map(ledger_entry_from_row).collect()
    }

    #[instrument(skip(self, entry), fields(flower_id = %entry.flower_id, kind = entry.kind.as_str()), err)]
    async fn append_ledger_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, StoreError> {
        let committed = entry.commit(LedgerEntryId::new())?;
        insert_ledger_entry(&*self.pool, &committed)
            .await
            .map_err(|e| map_sqlx_error("append_ledger_entry", e))?;
        Ok(committed)
    }

    #[instrument(skip(self), fields(batch_id = %id), err)]
    async fn get_batch(&self, id: BatchId) -> Result<Batch, StoreError> {
        let row = sqlx::query(&format!("SELECT {BATCH_COLUMNS} FROM batches WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_batch", e))?;

        match row {
            Some(row) => batch_from_row(&row),
            None => Err(StoreError::batch_not_found(id)),
        }
    }

    #[instrument(skip(self), fields(flower_id = %flower_id), err)]
    async fn list_batches(&self, flower_id: FlowerId) -> Result<Vec<Batch>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE flower_id = $1 ORDER BY received_at, id"
        ))
        .bind(*flower_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_batches", e))?;

        rows.iter().map(batch_from_row).collect()
    }

    #[instrument(skip(self), fields(flower_id = %flower_id), err)]
    async fn list_active_batches(&self, flower_id: FlowerId) -> Result<Vec<Batch>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE flower_id = $1 AND state = 'active' ORDER BY expires_at, id"
        ))
        .bind(*flower_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_active_batches", e))?;

        rows.iter().map(batch_from_row).collect()
    }

    #[instrument(skip(self, batch), fields(batch_id = %batch.id), err)]
    async fn save_batch(&self, batch: &Batch) -> Result<(), StoreError> {
        upsert_batch(&*self.pool, batch)
            .await
            .map_err(|e| map_sqlx_error("save_batch", e))?;
        Ok(())
    }

    #[instrument(skip(self, batch, entry), fields(batch_id = %batch.id), err)]
    async fn complete_inspection(
        &self,
        batch: &Batch,
        entry: NewLedgerEntry,
    ) -> Result<LedgerEntry, StoreError> {
        StoreError::check_inspection_entry(batch, &entry)?;
        let committed = entry.commit(LedgerEntryId::new())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("complete_inspection", e))?;

        // Guarded on the prior state so a concurrent inspection cannot land twice.
        let updated = sqlx::query(
            r#"
            UPDATE batches
            SET quantity_passed = $2, state = $3, inspected_at = $4, inspection_note = $5
            WHERE id = $1 AND state = 'received'
            "#,
        )
        .bind(*batch.id.as_uuid())
        .bind(i64::try_from(batch.quantity_passed).unwrap_or(i64::MAX))
        .bind(batch.state.as_str())
        .bind(batch.inspected_at)
        .bind(batch.inspection_note.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("complete_inspection", e))?;
        if updated.rows_affected() == 0 {
            let stored_state: Option<String> =
                sqlx::query_scalar("SELECT state FROM batches WHERE id = $1")
                    .bind(*batch.id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("complete_inspection", e))?;
            return Err(match stored_state {
                Some(_) => StoreError::already_inspected(batch.id),
                None => StoreError::batch_not_found(batch.id),
            });
        }
        insert_ledger_entry(&mut *tx, &committed)
            .await
            .map_err(|e| map_sqlx_error("complete_inspection", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("complete_inspection", e))?;
        Ok(committed)
    }
}

async fn insert_ledger_entry<'e, E>(executor: E, entry: &LedgerEntry) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO ledger_entries (id, flower_id, batch_id, delta, kind, occurred_at, reason)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(*entry.id.as_uuid())
    .bind(*entry.flower_id.as_uuid())
    .bind(entry.batch_id.map(|b| *b.as_uuid()))
    .bind(entry.delta)
    .bind(entry.kind.as_str())
    .bind(entry.occurred_at)
    .bind(&entry.reason)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

async fn upsert_batch<'e, E>(executor: E, batch: &Batch) -> Result<u64, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO batches (
            id, flower_id, quantity_received, quantity_passed, received_at,
            expires_at, state, inspected_at, inspection_note
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE SET
            quantity_passed = EXCLUDED.quantity_passed,
            state = EXCLUDED.state,
            inspected_at = EXCLUDED.inspected_at,
            inspection_note = EXCLUDED.inspection_note
        "#,
    )
    .bind(*batch.id.as_uuid())
    .bind(*batch.flower_id.as_uuid())
    .bind(i64::try_from(batch.quantity_received).unwrap_or(i64::MAX))
    .bind(i64::try_from(batch.quantity_passed).unwrap_or(i64::MAX))
    .bind(batch.received_at)
    .bind(batch.expires_at)
    .bind(batch.state.as_str())
    .bind(batch.inspected_at)
    .bind(batch.inspection_note.as_deref())
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

fn flower_from_row(row: &PgRow) -> Result<Flower, StoreError> {
    let abc_class: Option<String> = row.try_get("abc_class").map_err(decode_error)?;
    Ok(Flower {
        id: FlowerId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        category: row.try_get("category").map_err(decode_error)?,
        abc_class: abc_class
            .map(|c| c.parse::<AbcClass>())
            .transpose()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        shelf_life_days: to_u32(row, "shelf_life_days")?,
        unit_price: row.try_get("unit_price").map_err(decode_error)?,
        seasonal_factor: row.try_get("seasonal_factor").map_err(decode_error)?,
        pass_rate: row.try_get("pass_rate").map_err(decode_error)?,
        lead_time_days: to_u32(row, "lead_time_days")?,
        review_cycle_days: to_u32(row, "review_cycle_days")?,
    })
}

fn batch_from_row(row: &PgRow) -> Result<Batch, StoreError> {
    let state: String = row.try_get("state").map_err(decode_error)?;
    Ok(Batch {
        id: BatchId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode_error)?),
        flower_id: FlowerId::from_uuid(row.try_get::<Uuid, _>("flower_id").map_err(decode_error)?),
        quantity_received: to_u64(row, "quantity_received")?,
        quantity_passed: to_u64(row, "quantity_passed")?,
        received_at: row.try_get("received_at").map_err(decode_error)?,
        expires_at: row.try_get("expires_at").map_err(decode_error)?,
        state: state
            .parse::<BatchState>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        inspected_at: row.try_get("inspected_at").map_err(decode_error)?,
        inspection_note: row.try_get("inspection_note").map_err(decode_error)?,
    })
}

fn ledger_entry_from_row(row: &PgRow) -> Result<LedgerEntry, StoreError> {
    let kind: String = row.try_get("kind").map_err(decode_error)?;
    let batch_id: Option<Uuid> = row.try_get("batch_id").map_err(decode_error)?;
    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode_error)?),
        flower_id: FlowerId::from_uuid(row.try_get::<Uuid, _>("flower_id").map_err(decode_error)?),
        batch_id: batch_id.map(BatchId::from_uuid),
        delta: row.try_get("delta").map_err(decode_error)?,
        kind: kind
            .parse::<LedgerKind>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        occurred_at: row.try_get("occurred_at").map_err(decode_error)?,
        reason: row.try_get("reason").map_err(decode_error)?,
    })
}

fn to_u32(row: &PgRow, column: &str) -> Result<u32, StoreError> {
    let v: i32 = row.try_get(column).map_err(decode_error)?;
    u32::try_from(v).map_err(|_| StoreError::Corrupt(format!("{column} is negative ({v})")))
}

fn to_u64(row: &PgRow, column: &str) -> Result<u64, StoreError> {
    let v: i64 = row.try_get(column).map_err(decode_error)?;
    u64::try_from(v).map_err(|_| StoreError::Corrupt(format!("{column} is negative ({v})")))
}

fn to_i32(field: &str, v: u32) -> Result<i32, StoreError> {
    i32::try_from(v).map_err(|_| StoreError::Corrupt(format!("{field} out of range ({v})")))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") | Some("23514") => StoreError::Corrupt(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Timeout(format!("timed out acquiring a connection in {operation}"))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        e @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)) => {
            StoreError::Corrupt(format!("decode error in {operation}: {e}"))
        }
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}
