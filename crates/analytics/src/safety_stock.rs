//! Safety stock sizing.
//!
//! `ceil(max(1, Z(service_level) * sqrt(lead_time_weeks) * σ * seasonal / pass_rate))`
//!
//! Seasonal factor and pass rate are clamped by policy; the pass rate lower
//! bound keeps the division finite.

use serde::{Deserialize, Serialize};

use bloomstock_inventory::{AbcClass, Flower};

use crate::error::AnalyticsError;
use crate::policy::AnalyticsPolicy;
use crate::zscore::ZTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyStockInput {
    pub lead_time_days: u32,
    pub seasonal_factor: f64,
    pub pass_rate: f64,
    /// Weekly demand standard deviation.
    pub std_dev: f64,
}

impl SafetyStockInput {
    pub fn for_flower(flower: &Flower, std_dev: f64) -> Self {
        Self {
            lead_time_days: flower.lead_time_days,
            seasonal_factor: flower.seasonal_factor,
            pass_rate: flower.pass_rate,
            std_dev,
        }
    }
}

/// Lead time in weeks, from days clamped to the policy bounds (never under one day).
pub fn lead_time_weeks(lead_time_days: u32, policy: &AnalyticsPolicy) -> f64 {
    policy
        .lead_time_days
        .apply(f64::from(lead_time_days))
        .max(1.0)
        / 7.0
}

pub fn safety_stock(
    input: &SafetyStockInput,
    z_table: &ZTable,
    policy: &AnalyticsPolicy,
) -> Result<f64, AnalyticsError> {
    if !(input.std_dev.is_finite() && input.std_dev >= 0.0) {
        return Err(AnalyticsError::InvalidInput(format!(
            "standard deviation must be finite and non-negative, got {}",
            input.std_dev
        )));
    }

    let z = z_table.z(policy.service_level);
    let seasonal = policy.seasonal_factor.apply(input.seasonal_factor);
    let pass_rate = policy.pass_rate.apply(input.pass_rate);
    let raw = z * lead_time_weeks(input.lead_time_days, policy).sqrt() * input.std_dev * seasonal
        / pass_rate;

    if !raw.is_finite() {
        return Err(AnalyticsError::InvalidInput(format!(
            "safety stock evaluated to a non-finite value ({raw})"
        )));
    }

    Ok(raw.max(1.0).ceil())
}

/// Safety stock used when the calculation itself cannot be carried out:
/// the class default weekly demand, never below one unit.
pub fn fallback_safety_stock(class: Option<AbcClass>, policy: &AnalyticsPolicy) -> f64 {
    policy.class_defaults.weekly_demand(class).max(1.0).ceil()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(lead: u32, sd: f64) -> SafetyStockInput {
        SafetyStockInput {
            lead_time_days: lead,
            seasonal_factor: 1.0,
            pass_rate: 1.0,
            std_dev: sd,
        }
    }

    #[test]
    fn worked_example() {
        // z=1.65, lead 7 days -> 1 week, σ=10 -> 16.5 -> 17
        let ss = safety_stock(&input(7, 10.0), &ZTable::standard(), &AnalyticsPolicy::default())
            .unwrap();
        assert_eq!(ss, 17.0);
    }

    #[test]
    fn pass_rate_inflates_buffer_and_zero_is_clamped() {
        let policy = AnalyticsPolicy::default();
        let table = ZTable::standard();
        let mut i = input(7, 10.0);
        i.pass_rate = 0.0;
        // clamped to 0.1 -> 165
        assert_eq!(safety_stock(&i, &table, &policy).unwrap(), 165.0);
    }

    #[test]
    fn zero_variability_still_yields_one() {
        let ss = safety_stock(&input(3, 0.0), &ZTable::standard(), &AnalyticsPolicy::default())
            .unwrap();
        assert_eq!(ss, 1.0);
    }

    #[test]
    fn lead_time_is_clamped() {
        let policy = AnalyticsPolicy::default();
        assert_eq!(lead_time_weeks(0, &policy), 1.0 / 7.0);
        assert_eq!(lead_time_weeks(90, &policy), 30.0 / 7.0);
    }

    #[test]
    fn rejects_non_finite_deviation() {
        let err = safety_stock(&input(7, f64::NAN), &ZTable::standard(), &AnalyticsPolicy::default());
        assert!(err.is_err());
        assert_eq!(fallback_safety_stock(Some(AbcClass::C), &AnalyticsPolicy::default()), 8.0);
    }

    proptest! {
        #[test]
        fn always_at_least_one(
            lead in 0u32..60,
            sd in 0.0f64..500.0,
            seasonal in -1.0f64..5.0,
            pass in -1.0f64..2.0,
        ) {
            let i = SafetyStockInput { lead_time_days: lead, seasonal_factor: seasonal, pass_rate: pass, std_dev: sd };
            let ss = safety_stock(&i, &ZTable::standard(), &AnalyticsPolicy::default()).unwrap();
            prop_assert!(ss >= 1.0);
        }

        /// Property: monotone non-decreasing in lead time, σ and service level.
        #[test]
        fn monotone_in_inputs(
            lead in 1u32..40,
            extra_lead in 0u32..10,
            sd in 0.0f64..200.0,
            extra_sd in 0.0f64..50.0,
            level in 0.5f64..0.99,
            extra_level in 0.0f64..0.009,
        ) {
            let table = ZTable::standard();
            let policy = AnalyticsPolicy { service_level: level, ..AnalyticsPolicy::default() };
            let higher = AnalyticsPolicy { service_level: level + extra_level, ..AnalyticsPolicy::default() };

            let base = safety_stock(&input(lead, sd), &table, &policy).unwrap();
            prop_assert!(safety_stock(&input(lead + extra_lead, sd), &table, &policy).unwrap() >= base);
            prop_assert!(safety_stock(&input(lead, sd + extra_sd), &table, &policy).unwrap() >= base);
            prop_assert!(safety_stock(&input(lead, sd), &table, &higher).unwrap() >= base);
        }
    }
}
