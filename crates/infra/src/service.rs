//! `InventoryAnalyticsService`: the surface the report/presentation layer calls.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use bloomstock_analytics::{
    AbcReport, AnalyticsPolicy, ExpiringBatch, Recommendation, ZTable, expiring_batches,
};
use bloomstock_core::{BatchId, FlowerId};
use bloomstock_inventory::{Batch, LedgerEntry, NewLedgerEntry};

use crate::cache::{SnapshotCache, SnapshotKey};
use crate::config::AnalyticsConfig;
use crate::engine::AnalyticsEngine;
use crate::error::ServiceError;
use crate::snapshot::{DemandAnalysisRow, InventorySnapshot, SnapshotPass, SnapshotRow};
use crate::store::LedgerStore;

/// Result of a completed inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionOutcome {
    pub batch: Batch,
    pub ledger_entry: LedgerEntry,
    /// The flower's refreshed pass rate; `None` if the refresh failed.
    pub pass_rate: Option<f64>,
}

pub struct InventoryAnalyticsService<S> {
    engine: Arc<AnalyticsEngine<S>>,
    cache: SnapshotCache,
    pass: SnapshotPass,
}

impl<S> InventoryAnalyticsService<S>
where
    S: LedgerStore + Clone + 'static,
{
    pub fn new(store: S, config: &AnalyticsConfig) -> Self {
        Self::with_z_table(store, config, ZTable::standard())
    }

    pub fn with_z_table(store: S, config: &AnalyticsConfig, z_table: ZTable) -> Self {
        let engine = AnalyticsEngine::new(
            store,
            Arc::new(config.policy.clone()),
            Arc::new(z_table),
        );
        Self {
            engine: Arc::new(engine),
            cache: SnapshotCache::new(SnapshotKey::new(config.cache.key.clone()), config.cache.ttl()),
            pass: SnapshotPass::new(config.pass.worker_count(), config.pass.item_timeout()),
        }
    }

    fn store(&self) -> &S {
        self.engine.store()
    }

    fn policy(&self) -> &AnalyticsPolicy {
        self.engine.policy()
    }

    /// Full per-item pass, served from cache within the TTL.
    pub async fn get_inventory_snapshot(&self) -> Result<Arc<InventorySnapshot>, ServiceError> {
        let build = self.pass.run(self.engine.clone(), Utc::now());
        self.cache.get_or_build(build).await.map_err(|e| {
            warn!(error = ?e, "inventory snapshot unavailable");
            ServiceError::from(e)
        })
    }

    pub async fn get_inventory_rows(&self) -> Result<Vec<SnapshotRow>, ServiceError> {
        Ok(self.get_inventory_snapshot().await?.rows())
    }

    pub async fn get_demand_analysis(&self) -> Result<Vec<DemandAnalysisRow>, ServiceError> {
        Ok(self.get_inventory_snapshot().await?.demand_rows())
    }

    pub async fn get_abc_report(&self) -> Result<AbcReport, ServiceError> {
        Ok(self.get_inventory_snapshot().await?.abc.clone())
    }

    /// Drop the cached snapshot so the next read recomputes it.
    pub async fn invalidate_snapshot(&self) {
        self.cache.invalidate().await;
    }

    /// Canonical stock for one flower, computed fresh from the ledger.
    pub async fn get_current_stock(&self, flower_id: FlowerId) -> Result<u64, ServiceError> {
        self.store().get_flower(flower_id).await?;
        Ok(self.engine.current_stock(flower_id).await)
    }

    pub async fn get_recommendation(
        &self,
        flower_id: FlowerId,
    ) -> Result<Recommendation, ServiceError> {
        self.get_recommendation_at(flower_id, Utc::now()).await
    }

    /// Fresh recommendation for one flower, bypassing the snapshot cache.
    ///
    /// An analysis that exceeds the item timeout yields a `CalculationError`
    /// recommendation rather than an error.
    pub async fn get_recommendation_at(
        &self,
        flower_id: FlowerId,
        as_of: DateTime<Utc>,
    ) -> Result<Recommendation, ServiceError> {
        let flower = self.store().get_flower(flower_id).await?;

        match tokio::time::timeout(self.pass.item_timeout, self.engine.analyze_flower(&flower, as_of))
            .await
        {
            Ok(Ok(analysis)) => Ok(analysis.recommendation),
            Ok(Err(e)) => {
                warn!(flower_id = %flower_id, error = ?e, "recommendation failed");
                Err(e.into())
            }
            Err(_) => {
                warn!(flower_id = %flower_id, "recommendation timed out");
                Ok(Recommendation::calculation_error(format!(
                    "analysis timed out after {} ms",
                    self.pass.item_timeout.as_millis()
                )))
            }
        }
    }

    pub async fn get_expiry_report(
        &self,
        horizon_days: Option<i64>,
    ) -> Result<Vec<ExpiringBatch>, ServiceError> {
        self.get_expiry_report_at(horizon_days, Utc::now()).await
    }

    /// Active batches already expired or expiring within the horizon.
    ///
    /// Flowers whose batches cannot be read are skipped and logged.
    pub async fn get_expiry_report_at(
        &self,
        horizon_days: Option<i64>,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ExpiringBatch>, ServiceError> {
        let horizon = horizon_days.unwrap_or(self.policy().expiry_horizon_days);
        if horizon < 0 {
            return Err(ServiceError::invalid("horizon_days", "cannot be negative"));
        }

        let mut active = Vec::new();
        for flower in self.store().list_flowers().await? {
            match self.store().list_active_batches(flower.id).await {
                Ok(batches) => active.extend(batches),
                Err(e) => {
                    warn!(flower_id = %flower.id, error = ?e, "batch read failed; skipped in expiry report");
                }
            }
        }
        Ok(expiring_batches(&active, as_of, horizon))
    }

    /// Complete inspection of a received batch.
    ///
    /// Moves the batch to `Inspected`, appends an inbound entry for the passed
    /// quantity and refreshes the flower's observed pass rate.
    pub async fn record_inspection(
        &self,
        batch_id: BatchId,
        passed_qty: u64,
        note: &str,
    ) -> Result<InspectionOutcome, ServiceError> {
        let mut batch = self.store().get_batch(batch_id).await?;
        let now = Utc::now();
        batch.inspect(passed_qty, note, now)?;

        let entry = NewLedgerEntry::inbound(
            batch.flower_id,
            Some(batch.id),
            passed_qty,
            now,
            format!("inspection passed: {}", note.trim()),
        );
        let ledger_entry = self.store().complete_inspection(&batch, entry).await?;
        info!(
            batch_id = %batch.id,
            flower_id = %batch.flower_id,
            received = batch.quantity_received,
            passed = passed_qty,
            "inspection recorded"
        );

        let pass_rate = match self.refresh_pass_rate(batch.flower_id).await {
            Ok(rate) => Some(rate),
            Err(e) => {
                warn!(flower_id = %batch.flower_id, error = ?e, "pass rate refresh failed");
                None
            }
        };

        Ok(InspectionOutcome {
            batch,
            ledger_entry,
            pass_rate,
        })
    }

    /// Append a manual correction to a flower's ledger.
    pub async fn record_stock_adjustment(
        &self,
        flower_id: FlowerId,
        delta: i64,
        reason: &str,
    ) -> Result<LedgerEntry, ServiceError> {
        if delta == 0 {
            return Err(ServiceError::invalid("delta", "adjustment cannot be zero"));
        }
        if reason.trim().is_empty() {
            return Err(ServiceError::invalid("reason", "reason cannot be empty"));
        }
        self.store().get_flower(flower_id).await?;

        let entry = self
            .store()
            .append_ledger_entry(NewLedgerEntry::adjustment(
                flower_id,
                delta,
                Utc::now(),
                reason.trim(),
            ))
            .await?;
        info!(flower_id = %flower_id, delta, "stock adjustment recorded");
        Ok(entry)
    }

    async fn refresh_pass_rate(&self, flower_id: FlowerId) -> Result<f64, ServiceError> {
        let batches = self.store().list_batches(flower_id).await?;
        let mut flower = self.store().get_flower(flower_id).await?;
        let Some(observed) = cumulative_pass_rate(&batches) else {
            return Ok(flower.pass_rate);
        };

        flower.pass_rate = self.policy().pass_rate.apply(observed);
        self.store().upsert_flower(&flower).await?;
        Ok(flower.pass_rate)
    }
}

/// Total passed over total received across inspected batches.
fn cumulative_pass_rate(batches: &[Batch]) -> Option<f64> {
    let (passed, received) = batches
        .iter()
        .filter_map(Batch::inspection_counts)
        .fold((0u64, 0u64), |(p, r), (bp, br)| (p + bp, r + br));
    (received > 0).then(|| passed as f64 / received as f64)
}
