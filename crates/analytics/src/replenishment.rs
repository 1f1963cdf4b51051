//! Tiered replenishment recommendation.

use serde::{Deserialize, Serialize};

use crate::policy::AnalyticsPolicy;

/// Urgency tier, lowest to highest, plus a marker for failed computations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplenishmentLevel {
    None,
    Suggested,
    Urgent,
    Critical,
    /// The inputs could not be computed; no ordering advice is given.
    CalculationError,
}

impl ReplenishmentLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplenishmentLevel::None => "NONE",
            ReplenishmentLevel::Suggested => "SUGGESTED",
            ReplenishmentLevel::Urgent => "URGENT",
            ReplenishmentLevel::Critical => "CRITICAL",
            ReplenishmentLevel::CalculationError => "CALCULATION_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentInput {
    pub current_stock: u64,
    pub safety_stock: f64,
    pub weekly_demand: f64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub need_replenishment: bool,
    pub level: ReplenishmentLevel,
    pub reason: String,
    pub suggested_order_qty: u64,
    /// Units expected to survive inspection out of the suggested order.
    pub expected_pass_qty: u64,
    pub shortage: u64,
    pub coverage_days: f64,
}

impl Recommendation {
    pub fn calculation_error(reason: impl Into<String>) -> Self {
        Self {
            need_replenishment: false,
            level: ReplenishmentLevel::CalculationError,
            reason: reason.into(),
            suggested_order_qty: 0,
            expected_pass_qty: 0,
            shortage: 0,
            coverage_days: 0.0,
        }
    }
}

/// Compare stock against the safety target, tier the urgency and size an order.
///
/// Tiering, first match wins:
/// 1. stock is zero → `Critical`
/// 2. shortage > urgent_shortage_weeks × demand, or coverage < urgent days → `Urgent`
/// 3. shortage > suggested_shortage_weeks × demand, or coverage < suggested days → `Suggested`
/// 4. otherwise `None`
pub fn recommend(input: &ReplenishmentInput, policy: &AnalyticsPolicy) -> Recommendation {
    let target = input.safety_stock.max(0.0).ceil() as u64;
    let stock = input.current_stock;
    let demand = input.weekly_demand.max(0.0);
    let coverage_days = if demand > 0.0 {
        stock as f64 / demand * 7.0
    } else {
        0.0
    };

    if stock >= target {
        return Recommendation {
            need_replenishment: false,
            level: ReplenishmentLevel::None,
            reason: format!("stock {stock} at or above safety level {target}"),
            suggested_order_qty: 0,
            expected_pass_qty: 0,
            shortage: 0,
            coverage_days,
        };
    }

    let shortage = target - stock;
    let shortage_f = shortage as f64;
    let urgency = &policy.urgency;

    let (level, reason) = if stock == 0 {
        (ReplenishmentLevel::Critical, "stock is zero".to_string())
    } else if shortage_f > urgency.urgent_shortage_weeks * demand
        || coverage_days < urgency.urgent_coverage_days
    {
        (
            ReplenishmentLevel::Urgent,
            format!("shortage of {shortage} units, stock covers {coverage_days:.1} days"),
        )
    } else if shortage_f > urgency.suggested_shortage_weeks * demand
        || coverage_days < urgency.suggested_coverage_days
    {
        (
            ReplenishmentLevel::Suggested,
            format!("shortage of {shortage} units, stock covers {coverage_days:.1} days"),
        )
    } else {
        (ReplenishmentLevel::None, "stock adequate".to_string())
    };

    let pass_rate = policy.pass_rate.apply(input.pass_rate);
    let order = (shortage_f / pass_rate + demand * urgency.buffer_weeks).max(1.0).ceil();
    let suggested_order_qty = order as u64;
    let expected_pass_qty = (order * pass_rate).floor() as u64;

    Recommendation {
        need_replenishment: true,
        level,
        reason,
        suggested_order_qty,
        expected_pass_qty,
        shortage,
        coverage_days,
    }
}
