use serde::{Deserialize, Serialize};

use crate::policy::AnalyticsPolicy;
use crate::variability::VariabilityEstimate;

/// Stock position relative to the safety target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    BelowSafety,
    Healthy,
    Overstocked,
}

impl StockStatus {
    pub fn classify(
        current_stock: u64,
        safety_stock: f64,
        weekly_demand: f64,
        policy: &AnalyticsPolicy,
    ) -> Self {
        let target = safety_stock.max(0.0).ceil();
        let stock = current_stock as f64;
        if current_stock == 0 {
            StockStatus::OutOfStock
        } else if stock < target {
            StockStatus::BelowSafety
        } else if stock > target + weekly_demand.max(0.0) * policy.overstock_weeks {
            StockStatus::Overstocked
        } else {
            StockStatus::Healthy
        }
    }
}

/// Shape of an item's weekly demand.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandPattern {
    /// Too few observed weeks; figures are class defaults.
    InsufficientData,
    Stable,
    Variable,
    Erratic,
}

impl DemandPattern {
    pub fn classify(variability: &VariabilityEstimate, policy: &AnalyticsPolicy) -> Self {
        if variability.is_degraded() {
            return DemandPattern::InsufficientData;
        }
        let cv = variability.coefficient_of_variation();
        if cv < policy.stable_cv_max {
            DemandPattern::Stable
        } else if cv < policy.variable_cv_max {
            DemandPattern::Variable
        } else {
            DemandPattern::Erratic
        }
    }
}
