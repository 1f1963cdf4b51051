//! Tunable replenishment policy.
//!
//! These constants are business policy rather than physical law. The defaults
//! reproduce the thresholds the stores have been operating with; override them
//! through configuration, not code.

use serde::{Deserialize, Serialize};

use bloomstock_inventory::AbcClass;

use crate::error::AnalyticsError;

/// Closed interval used to bound planning attributes.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clamp {
    pub min: f64,
    pub max: f64,
}

impl Clamp {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp `value` into the interval. Non-finite input maps to `min`.
    pub fn apply(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    fn check(&self, name: &str) -> Result<(), AnalyticsError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.min > 0.0 && self.min <= self.max) {
            return Err(AnalyticsError::InvalidPolicy(format!(
                "{name} bounds must be positive and ordered (min={}, max={})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Per-class fallbacks used when an item's own history is too sparse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassDefaults {
    pub demand_a: f64,
    pub demand_b: f64,
    pub demand_c: f64,
    pub demand_unknown: f64,
    pub cv_a: f64,
    pub cv_b: f64,
    pub cv_c: f64,
    pub cv_unknown: f64,
}

impl Default for ClassDefaults {
    fn default() -> Self {
        Self {
            demand_a: 25.0,
            demand_b: 15.0,
            demand_c: 8.0,
            demand_unknown: 10.0,
            cv_a: 0.4,
            cv_b: 0.3,
            cv_c: 0.2,
            cv_unknown: 0.4,
        }
    }
}

impl ClassDefaults {
    /// Default weekly demand (units/week) for a class tag.
    pub fn weekly_demand(&self, class: Option<AbcClass>) -> f64 {
        match class {
            Some(AbcClass::A) => self.demand_a,
            Some(AbcClass::B) => self.demand_b,
            Some(AbcClass::C) => self.demand_c,
            None => self.demand_unknown,
        }
    }

    /// Default coefficient of variation for a class tag.
    pub fn coefficient_of_variation(&self, class: Option<AbcClass>) -> f64 {
        match class {
            Some(AbcClass::A) => self.cv_a,
            Some(AbcClass::B) => self.cv_b,
            Some(AbcClass::C) => self.cv_c,
            None => self.cv_unknown,
        }
    }
}

/// Urgency tiering and order sizing constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyPolicy {
    /// Shortage above this many weeks of demand is urgent.
    pub urgent_shortage_weeks: f64,
    /// Shortage above this many weeks of demand is worth a suggestion.
    pub suggested_shortage_weeks: f64,
    pub urgent_coverage_days: f64,
    pub suggested_coverage_days: f64,
    /// Extra weeks of demand ordered on top of the shortage.
    pub buffer_weeks: f64,
}

impl Default for UrgencyPolicy {
    fn default() -> Self {
        Self {
            urgent_shortage_weeks: 2.0,
            suggested_shortage_weeks: 1.0,
            urgent_coverage_days: 3.0,
            suggested_coverage_days: 7.0,
            buffer_weeks: 1.0,
        }
    }
}

/// Cumulative-value cut-offs (percent) for the ABC partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbcThresholds {
    pub a_max_pct: f64,
    pub b_max_pct: f64,
}

impl Default for AbcThresholds {
    fn default() -> Self {
        Self {
            a_max_pct: 80.0,
            b_max_pct: 95.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsPolicy {
    pub lookback_weeks: u32,
    /// Non-empty weeks required before the demand blend is trusted.
    pub min_demand_weeks: usize,
    /// Non-empty weeks required before the sample deviation is trusted.
    pub min_variability_weeks: usize,
    /// Weight of the median in the demand blend; the trimmed mean gets the rest.
    pub median_weight: f64,
    /// Standard deviation never drops below this fraction of the mean.
    pub std_dev_floor_ratio: f64,
    /// Target probability of not stocking out during a replenishment cycle.
    pub service_level: f64,
    pub lead_time_days: Clamp,
    pub seasonal_factor: Clamp,
    pub pass_rate: Clamp,
    pub class_defaults: ClassDefaults,
    pub urgency: UrgencyPolicy,
    pub abc: AbcThresholds,
    /// Stock above safety + this many weeks of demand is overstocked.
    pub overstock_weeks: f64,
    pub stable_cv_max: f64,
    pub variable_cv_max: f64,
    pub expiry_horizon_days: i64,
}

impl Default for AnalyticsPolicy {
    fn default() -> Self {
        Self {
            lookback_weeks: 12,
            min_demand_weeks: 4,
            min_variability_weeks: 2,
            median_weight: 0.6,
            std_dev_floor_ratio: 0.10,
            service_level: 0.95,
            lead_time_days: Clamp::new(1.0, 30.0),
            seasonal_factor: Clamp::new(0.1, 3.0),
            pass_rate: Clamp::new(0.1, 1.0),
            class_defaults: ClassDefaults::default(),
            urgency: UrgencyPolicy::default(),
            abc: AbcThresholds::default(),
            overstock_weeks: 4.0,
            stable_cv_max: 0.3,
            variable_cv_max: 0.7,
            expiry_horizon_days: 3,
        }
    }
}

impl AnalyticsPolicy {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.lookback_weeks == 0 {
            return Err(AnalyticsError::InvalidPolicy(
                "lookback_weeks must be positive".to_string(),
            ));
        }
        if self.min_variability_weeks < 2 {
            return Err(AnalyticsError::InvalidPolicy(
                "min_variability_weeks must be >= 2 to compute a sample deviation".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.median_weight) {
            return Err(AnalyticsError::InvalidPolicy(
                "median_weight must be within [0, 1]".to_string(),
            ));
        }
        if !(self.service_level > 0.0 && self.service_level < 1.0) {
            return Err(AnalyticsError::InvalidPolicy(
                "service_level must be within (0, 1)".to_string(),
            ));
        }
        self.lead_time_days.check("lead_time_days")?;
        self.seasonal_factor.check("seasonal_factor")?;
        self.pass_rate.check("pass_rate")?;
        if self.pass_rate.max > 1.0 {
            return Err(AnalyticsError::InvalidPolicy(
                "pass_rate upper bound cannot exceed 1.0".to_string(),
            ));
        }
        if self.abc.a_max_pct > self.abc.b_max_pct {
            return Err(AnalyticsError::InvalidPolicy(
                "ABC cut-off for A must not exceed the cut-off for B".to_string(),
            ));
        }
        if self.stable_cv_max > self.variable_cv_max {
            return Err(AnalyticsError::InvalidPolicy(
                "stable_cv_max must not exceed variable_cv_max".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(AnalyticsPolicy::default().validate().is_ok());
    }

    #[test]
    fn unknown_class_uses_declared_defaults() {
        let d = ClassDefaults::default();
        assert_eq!(d.weekly_demand(None), 10.0);
        assert_eq!(d.weekly_demand(Some(AbcClass::A)), 25.0);
        assert_eq!(d.coefficient_of_variation(None), 0.4);
        assert_eq!(d.coefficient_of_variation(Some(AbcClass::C)), 0.2);
    }

    #[test]
    fn clamp_maps_nan_to_lower_bound() {
        let c = Clamp::new(0.1, 1.0);
        assert_eq!(c.apply(f64::NAN), 0.1);
        assert_eq!(c.apply(0.0), 0.1);
        assert_eq!(c.apply(4.0), 1.0);
    }

    #[test]
    fn rejects_inverted_abc_cutoffs() {
        let mut policy = AnalyticsPolicy::default();
        policy.abc.a_max_pct = 96.0;
        assert!(policy.validate().is_err());
    }
}
