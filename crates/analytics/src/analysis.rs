//! One item's full analytics pass: demand → variability → safety stock → recommendation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloomstock_core::FlowerId;
use bloomstock_inventory::{AbcClass, Flower, LedgerEntry};

use crate::demand::{DemandEstimate, estimate_weekly_demand};
use crate::policy::AnalyticsPolicy;
use crate::replenishment::{Recommendation, ReplenishmentInput, recommend};
use crate::safety_stock::{SafetyStockInput, fallback_safety_stock, safety_stock};
use crate::status::{DemandPattern, StockStatus};
use crate::variability::{VariabilityEstimate, estimate_std_dev};
use crate::weekly::WeeklySeries;
use crate::zscore::ZTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAnalysis {
    pub flower_id: FlowerId,
    pub name: String,
    pub category: String,
    /// Catalog tag; informational only.
    pub abc_class: Option<AbcClass>,
    pub unit_price: f64,
    pub current_stock: u64,
    pub demand: DemandEstimate,
    pub variability: VariabilityEstimate,
    pub safety_stock: f64,
    /// The safety stock formula failed and the class default was used.
    pub safety_stock_degraded: bool,
    pub recommendation: Recommendation,
    pub stock_status: StockStatus,
    pub demand_pattern: DemandPattern,
    pub as_of: DateTime<Utc>,
}

impl ItemAnalysis {
    pub fn weekly_demand(&self) -> f64 {
        self.demand.weekly_demand
    }

    /// Any estimator in the chain fell back to defaults.
    pub fn is_degraded(&self) -> bool {
        self.demand.is_degraded() || self.variability.is_degraded() || self.safety_stock_degraded
    }
}

/// Analyze one flower from its ledger slice and already-aggregated stock.
///
/// `entries` may include anything; only outbound entries inside the lookback
/// window ending at `as_of` feed the estimators.
pub fn analyze_item(
    flower: &Flower,
    entries: &[LedgerEntry],
    current_stock: u64,
    as_of: DateTime<Utc>,
    policy: &AnalyticsPolicy,
    z_table: &ZTable,
) -> ItemAnalysis {
    let series = WeeklySeries::from_outbound(entries, as_of, policy.lookback_weeks);
    let demand = estimate_weekly_demand(&series, flower.abc_class, policy);
    let variability = estimate_std_dev(&series, flower.abc_class, policy);

    let (safety_stock, safety_stock_degraded) = match safety_stock(
        &SafetyStockInput::for_flower(flower, variability.std_dev),
        z_table,
        policy,
    ) {
        Ok(ss) => (ss, false),
        Err(_) => (fallback_safety_stock(flower.abc_class, policy), true),
    };

    let recommendation = recommend(
        &ReplenishmentInput {
            current_stock,
            safety_stock,
            weekly_demand: demand.weekly_demand,
            pass_rate: flower.pass_rate,
        },
        policy,
    );
    let stock_status =
        StockStatus::classify(current_stock, safety_stock, demand.weekly_demand, policy);
    let demand_pattern = DemandPattern::classify(&variability, policy);

    ItemAnalysis {
        flower_id: flower.id,
        name: flower.name.clone(),
        category: flower.category.clone(),
        abc_class: flower.abc_class,
        unit_price: flower.unit_price,
        current_stock,
        demand,
        variability,
        safety_stock,
        safety_stock_degraded,
        recommendation,
        stock_status,
        demand_pattern,
        as_of,
    }
}
