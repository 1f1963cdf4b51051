//! Inventory-wide snapshot: a bounded parallel pass over every flower.
//!
//! - Each flower is analyzed in its own task; at most `max_workers` run at once.
//! - Each task reads through the store on its own (pooled connection or cloned view).
//! - A task that fails or exceeds `item_timeout` is logged and excluded.
//! - ABC classification runs once every task has finished.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Span, error, info, instrument, warn};

use bloomstock_analytics::{
    AbcInput, AbcReport, DemandPattern, ItemAnalysis, Recommendation, StockStatus, classify,
};
use bloomstock_core::FlowerId;

use crate::engine::AnalyticsEngine;
use crate::store::{LedgerStore, StoreError};

/// A flower left out of the snapshot and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedItem {
    pub flower_id: FlowerId,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub generated_at: DateTime<Utc>,
    /// Ordered by flower name.
    pub items: Vec<ItemAnalysis>,
    pub abc: AbcReport,
    pub excluded: Vec<ExcludedItem>,
}

/// Per-item row of the inventory report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub flower_id: FlowerId,
    pub name: String,
    pub category: String,
    pub current_stock: u64,
    pub safety_stock: f64,
    pub weekly_demand: f64,
    pub stock_status: StockStatus,
    pub recommendation: Recommendation,
    pub degraded: bool,
}

impl From<&ItemAnalysis> for SnapshotRow {
    fn from(a: &ItemAnalysis) -> Self {
        Self {
            flower_id: a.flower_id,
            name: a.name.clone(),
            category: a.category.clone(),
            current_stock: a.current_stock,
            safety_stock: a.safety_stock,
            weekly_demand: a.weekly_demand(),
            stock_status: a.stock_status,
            recommendation: a.recommendation.clone(),
            degraded: a.is_degraded(),
        }
    }
}

/// Per-item row of the demand analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandAnalysisRow {
    pub flower_id: FlowerId,
    pub name: String,
    pub weekly_demand: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    pub weeks_observed: usize,
    pub pattern: DemandPattern,
    pub demand_degraded: bool,
    pub variability_degraded: bool,
}

impl From<&ItemAnalysis> for DemandAnalysisRow {
    fn from(a: &ItemAnalysis) -> Self {
        Self {
            flower_id: a.flower_id,
            name: a.name.clone(),
            weekly_demand: a.demand.weekly_demand,
            mean: a.variability.mean,
            std_dev: a.variability.std_dev,
            coefficient_of_variation: a.variability.coefficient_of_variation(),
            weeks_observed: a.demand.weeks_observed,
            pattern: a.demand_pattern,
            demand_degraded: a.demand.is_degraded(),
            variability_degraded: a.variability.is_degraded(),
        }
    }
}

impl InventorySnapshot {
    pub fn rows(&self) -> Vec<SnapshotRow> {
        self.items.iter().map(SnapshotRow::from).collect()
    }

    pub fn demand_rows(&self) -> Vec<DemandAnalysisRow> {
        self.items.iter().map(DemandAnalysisRow::from).collect()
    }

    pub fn item(&self, flower_id: FlowerId) -> Option<&ItemAnalysis> {
        self.items.iter().find(|i| i.flower_id == flower_id)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SnapshotPass {
    pub max_workers: usize,
    pub item_timeout: Duration,
}

impl SnapshotPass {
    pub fn new(max_workers: usize, item_timeout: Duration) -> Self {
        Self {
            max_workers: max_workers.max(1),
            item_timeout,
        }
    }

    /// Analyze every catalog flower as of `as_of`.
    ///
    /// Only a failure to list the catalog fails the pass.
    #[instrument(skip_all, fields(workers = self.max_workers, flowers, included, excluded), err)]
    pub async fn run<S>(
        &self,
        engine: Arc<AnalyticsEngine<S>>,
        as_of: DateTime<Utc>,
    ) -> Result<InventorySnapshot, StoreError>
    where
        S: LedgerStore + Clone + 'static,
    {
        let flowers = engine.store().list_flowers().await?;
        Span::current().record("flowers", flowers.len());

        let permits = Arc::new(Semaphore::new(self.max_workers));
        let mut pending: HashMap<FlowerId, String> = HashMap::with_capacity(flowers.len());
        let mut tasks = JoinSet::new();

        for flower in flowers {
            let permit = permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| StoreError::Unavailable(format!("worker pool closed: {e}")))?;
            pending.insert(flower.id, flower.name.clone());

            let engine = engine.clone();
            let item_timeout = self.item_timeout;
            tasks.spawn(async move {
                let _permit = permit;
                let outcome =
                    tokio::time::timeout(item_timeout, engine.analyze_flower(&flower, as_of)).await;
                (flower, outcome)
            });
        }

        let mut items = Vec::with_capacity(pending.len());
        let mut excluded = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (flower, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    error!(error = ?e, "snapshot worker aborted");
                    continue;
                }
            };
            pending.remove(&flower.id);

            let reason = match outcome {
                Ok(Ok(analysis)) => {
                    items.push(analysis);
                    continue;
                }
                Ok(Err(e)) => {
                    warn!(flower_id = %flower.id, error = ?e, "item analysis failed; excluded from snapshot");
                    e.to_string()
                }
                Err(_) => {
                    warn!(
                        flower_id = %flower.id,
                        timeout_ms = self.item_timeout.as_millis() as u64,
                        "item analysis timed out; excluded from snapshot"
                    );
                    format!("timed out after {} ms", self.item_timeout.as_millis())
                }
            };
            excluded.push(ExcludedItem {
                flower_id: flower.id,
                name: flower.name,
                reason,
            });
        }

        // Workers that panicked never reported back.
        excluded.extend(pending.into_iter().map(|(flower_id, name)| ExcludedItem {
            flower_id,
            name,
            reason: "worker aborted".to_string(),
        }));

        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.flower_id.cmp(&b.flower_id)));
        excluded.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.flower_id.cmp(&b.flower_id)));

        let abc = classify(
            items.iter().map(|a| AbcInput {
                flower_id: a.flower_id,
                name: a.name.clone(),
                unit_price: a.unit_price,
                current_stock: a.current_stock,
            }),
            &engine.policy().abc,
        );

        let span = Span::current();
        span.record("included", items.len());
        span.record("excluded", excluded.len());
        info!(
            included = items.len(),
            excluded = excluded.len(),
            total_value = abc.total_value,
            "inventory snapshot computed"
        );

        Ok(InventorySnapshot {
            generated_at: as_of,
            items,
            abc,
            excluded,
        })
    }
}
