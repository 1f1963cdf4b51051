//! Per-item analytics: ledger reads feeding the pure pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use bloomstock_analytics::{AnalyticsPolicy, ItemAnalysis, WeeklySeries, ZTable, analyze_item};
use bloomstock_core::FlowerId;
use bloomstock_inventory::Flower;

use crate::stock::StockAggregator;
use crate::store::{LedgerStore, StoreError};

#[derive(Debug)]
pub struct AnalyticsEngine<S> {
    store: S,
    stock: StockAggregator<S>,
    policy: Arc<AnalyticsPolicy>,
    z_table: Arc<ZTable>,
}

impl<S> AnalyticsEngine<S>
where
    S: LedgerStore + Clone,
{
    pub fn new(store: S, policy: Arc<AnalyticsPolicy>, z_table: Arc<ZTable>) -> Self {
        Self {
            stock: StockAggregator::new(store.clone()),
            store,
            policy,
            z_table,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &AnalyticsPolicy {
        &self.policy
    }

    pub async fn current_stock(&self, flower_id: FlowerId) -> u64 {
        self.stock.current_stock(flower_id).await
    }

    /// Analyze one flower as of `as_of`.
    ///
    /// The stock figure fails soft; a failed read of the demand window does not.
    pub async fn analyze_flower(
        &self,
        flower: &Flower,
        as_of: DateTime<Utc>,
    ) -> Result<ItemAnalysis, StoreError> {
        let current_stock = self.stock.current_stock(flower.id).await;
        let since = WeeklySeries::window_start(as_of, self.policy.lookback_weeks);
        let entries = self.store.list_ledger_entries(flower.id, Some(since)).await?;

        let analysis = analyze_item(
            flower,
            &entries,
            current_stock,
            as_of,
            &self.policy,
            &self.z_table,
        );
        if analysis.is_degraded() {
            debug!(
                flower_id = %flower.id,
                weeks_observed = analysis.demand.weeks_observed,
                "estimators fell back to class defaults"
            );
        }
        Ok(analysis)
    }

    pub async fn analyze(
        &self,
        flower_id: FlowerId,
        as_of: DateTime<Utc>,
    ) -> Result<ItemAnalysis, StoreError> {
        let flower = self.store.get_flower(flower_id).await?;
        self.analyze_flower(&flower, as_of).await
    }
}
