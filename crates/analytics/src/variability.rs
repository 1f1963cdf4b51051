use serde::{Deserialize, Serialize};

use bloomstock_inventory::AbcClass;

use crate::demand::EstimateSource;
use crate::policy::AnalyticsPolicy;
use crate::weekly::WeeklySeries;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariabilityEstimate {
    pub std_dev: f64,
    /// Mean of observed weeks, or the class default demand on fallback.
    pub mean: f64,
    pub source: EstimateSource,
    pub weeks_observed: usize,
}

impl VariabilityEstimate {
    pub fn is_degraded(&self) -> bool {
        self.source == EstimateSource::ClassDefault
    }

    /// σ / mean, or 0 when the mean is 0.
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean > 0.0 {
            self.std_dev / self.mean
        } else {
            0.0
        }
    }
}

/// Weekly demand standard deviation.
///
/// With fewer than `min_variability_weeks` observations this is
/// `default_demand(class) * class_cv(class)`. Otherwise the sample deviation of
/// the observed weeks, floored at `std_dev_floor_ratio * mean` so a near-flat
/// series never reads as zero risk.
pub fn estimate_std_dev(
    series: &WeeklySeries,
    class: Option<AbcClass>,
    policy: &AnalyticsPolicy,
) -> VariabilityEstimate {
    let observed = series.observed();
    let weeks_observed = observed.len();

    if weeks_observed < policy.min_variability_weeks.max(2) {
        let defaults = &policy.class_defaults;
        let mean = defaults.weekly_demand(class);
        return VariabilityEstimate {
            std_dev: mean * defaults.coefficient_of_variation(class),
            mean,
            source: EstimateSource::ClassDefault,
            weeks_observed,
        };
    }

    let mean = observed.iter().sum::<f64>() / weeks_observed as f64;
    let std_dev = sample_std_dev(&observed, mean).max(policy.std_dev_floor_ratio * mean);

    VariabilityEstimate {
        std_dev,
        mean,
        source: EstimateSource::Observed,
        weeks_observed,
    }
}

/// Sample standard deviation (n-1), deterministic.
pub fn sample_std_dev(xs: &[f64], mean: f64) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let var = xs
        .iter()
        .map(|x| {
            let d = x - mean;
            d * d
        })
        .sum::<f64>()
        / ((xs.len() - 1) as f64);
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_sample_not_population_deviation() {
        // [2, 4, 4, 4, 5, 5, 7, 9]: population sd = 2, sample sd = sqrt(32/7)
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = sample_std_dev(&xs, 5.0);
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn flat_series_is_floored_at_ten_percent_of_mean() {
        let series = WeeklySeries::from_bins(vec![20.0, 20.0, 0.0, 0.0]);
        let est = estimate_std_dev(&series, None, &AnalyticsPolicy::default());
        assert_eq!(est.source, EstimateSource::Observed);
        assert!((est.std_dev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn single_week_falls_back_to_class_cv() {
        let series = WeeklySeries::from_bins(vec![0.0, 30.0, 0.0]);
        let est = estimate_std_dev(&series, Some(AbcClass::B), &AnalyticsPolicy::default());
        assert!(est.is_degraded());
        assert!((est.std_dev - 15.0 * 0.3).abs() < 1e-12);
    }

    #[test]
    fn unknown_class_fallback() {
        let series = WeeklySeries::from_bins(vec![]);
        let est = estimate_std_dev(&series, None, &AnalyticsPolicy::default());
        assert!((est.std_dev - 4.0).abs() < 1e-12);
        assert!((est.coefficient_of_variation() - 0.4).abs() < 1e-12);
    }
}
