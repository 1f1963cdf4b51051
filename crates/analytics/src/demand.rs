//! Robust weekly demand estimation.
//!
//! Model:
//! - Bucket outbound quantities into weeks over the lookback window.
//! - With enough non-empty weeks, blend the median (resists promotion spikes and
//!   stockout weeks) with a quartile-trimmed mean (keeps some trend sensitivity).
//! - Otherwise fall back to the class default.

use serde::{Deserialize, Serialize};

use bloomstock_inventory::AbcClass;

use crate::policy::AnalyticsPolicy;
use crate::weekly::WeeklySeries;

/// Where an estimate came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateSource {
    /// Computed from the item's own history.
    Observed,
    /// History too sparse; the class default was used.
    ClassDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandEstimate {
    pub weekly_demand: f64,
    pub source: EstimateSource,
    pub weeks_observed: usize,
}

impl DemandEstimate {
    /// True when the estimator could not trust the data and used a fallback.
    pub fn is_degraded(&self) -> bool {
        self.source == EstimateSource::ClassDefault
    }
}

pub fn estimate_weekly_demand(
    series: &WeeklySeries,
    class: Option<AbcClass>,
    policy: &AnalyticsPolicy,
) -> DemandEstimate {
    let weeks_observed = series.non_empty_weeks();

    if weeks_observed < policy.min_demand_weeks.max(1) {
        return DemandEstimate {
            weekly_demand: policy.class_defaults.weekly_demand(class),
            source: EstimateSource::ClassDefault,
            weeks_observed,
        };
    }

    let sorted = series.observed_sorted();
    DemandEstimate {
        weekly_demand: robust_blend(&sorted, policy.median_weight),
        source: EstimateSource::Observed,
        weeks_observed,
    }
}

/// `w * median + (1 - w) * trimmed_mean` over ascending-sorted totals.
pub fn robust_blend(sorted: &[f64], median_weight: f64) -> f64 {
    median_weight * median(sorted) + (1.0 - median_weight) * trimmed_mean(sorted)
}

/// Median of an ascending-sorted slice (0 for an empty slice).
pub fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Mean after dropping the lowest and highest quartile (at least one value per end).
///
/// Slices too short to trim fall back to the median.
pub fn trimmed_mean(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    let trim = (n / 4).max(1);
    if n <= trim * 2 {
        return median(sorted);
    }
    let kept = &sorted[trim..n - trim];
    kept.iter().sum::<f64>() / kept.len() as f64
}
