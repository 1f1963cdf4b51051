//! Value-based ABC (Pareto) classification.

use serde::{Deserialize, Serialize};

use bloomstock_core::FlowerId;
use bloomstock_inventory::AbcClass;

use crate::policy::AbcThresholds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcInput {
    pub flower_id: FlowerId,
    pub name: String,
    pub unit_price: f64,
    pub current_stock: u64,
}

impl AbcInput {
    pub fn value(&self) -> f64 {
        let v = self.unit_price * self.current_stock as f64;
        if v.is_finite() && v > 0.0 { v } else { 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcItem {
    pub flower_id: FlowerId,
    pub name: String,
    pub value: f64,
    /// Share of total inventory value, percent.
    pub percentage: f64,
    pub cumulative_percentage: f64,
    pub class: AbcClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcClassSummary {
    pub class: AbcClass,
    pub count: usize,
    pub value: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbcReport {
    /// Items ranked by value, highest first.
    pub items: Vec<AbcItem>,
    /// One summary per class, in A, B, C order.
    pub classes: Vec<AbcClassSummary>,
    pub total_value: f64,
    pub total_items: usize,
}

impl AbcReport {
    pub fn summary(&self, class: AbcClass) -> Option<&AbcClassSummary> {
        self.classes.iter().find(|s| s.class == class)
    }
}

/// Rank items by `unit_price × stock` and partition by cumulative value share.
///
/// A cumulative share `<= a_max_pct` is class A, `<= b_max_pct` class B, the rest
/// class C. Equal values are ranked by flower id so the partition is stable.
/// With zero total value every item is class C.
pub fn classify(inputs: impl IntoIterator<Item = AbcInput>, thresholds: &AbcThresholds) -> AbcReport {
    let mut ranked: Vec<(AbcInput, f64)> = inputs
        .into_iter()
        .map(|i| {
            let v = i.value();
            (i, v)
        })
        .collect();
    ranked.sort_by(|(a, av), (b, bv)| bv.total_cmp(av).then_with(|| a.flower_id.cmp(&b.flower_id)));

    let total_value: f64 = ranked.iter().map(|(_, v)| v).sum();
    let mut cumulative = 0.0;
    let mut items = Vec::with_capacity(ranked.len());

    for (input, value) in ranked {
        cumulative += value;
        let (percentage, cumulative_percentage, class) = if total_value > 0.0 {
            let cum_pct = cumulative / total_value * 100.0;
            let class = if cum_pct <= thresholds.a_max_pct {
                AbcClass::A
            } else if cum_pct <= thresholds.b_max_pct {
                AbcClass::B
            } else {
                AbcClass::C
            };
            (value / total_value * 100.0, cum_pct, class)
        } else {
            (0.0, 0.0, AbcClass::C)
        };

        items.push(AbcItem {
            flower_id: input.flower_id,
            name: input.name,
            value,
            percentage,
            cumulative_percentage,
            class,
        });
    }

    let classes = [AbcClass::A, AbcClass::B, AbcClass::C]
        .into_iter()
        .map(|class| {
            let members = items.iter().filter(|i| i.class == class);
            let (count, value) = members.fold((0usize, 0.0f64), |(c, v), i| (c + 1, v + i.value));
            AbcClassSummary {
                class,
                count,
                value,
                percentage: if total_value > 0.0 { value / total_value * 100.0 } else { 0.0 },
            }
        })
        .collect();

    AbcReport {
        total_items: items.len(),
        items,
        classes,
        total_value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn item(price: f64, stock: u64) -> AbcInput {
        AbcInput {
            flower_id: FlowerId::new(),
            name: format!("flower-{price}-{stock}"),
            unit_price: price,
            current_stock: stock,
        }
    }

    #[test]
    fn pareto_partition_of_three_items() {
        let report = classify(
            vec![item(1.0, 100), item(10.0, 100), item(5.0, 100)],
            &AbcThresholds::default(),
        );

        let values: Vec<f64> = report.items.iter().map(|i| i.value).collect();
        assert_eq!(values, vec![1000.0, 500.0, 100.0]);
        let cum: Vec<f64> = report.items.iter().map(|i| i.cumulative_percentage).collect();
        assert_eq!(cum, vec![62.5, 93.75, 100.0]);
        let classes: Vec<AbcClass> = report.items.iter().map(|i| i.class).collect();
        assert_eq!(classes, vec![AbcClass::A, AbcClass::B, AbcClass::C]);
        assert_eq!(report.total_value, 1600.0);
    }

    #[test]
    fn boundary_goes_to_the_higher_tier() {
        // 80 / 100 exactly -> A
        let report = classify(vec![item(80.0, 1), item(20.0, 1)], &AbcThresholds::default());
        assert_eq!(report.items[0].cumulative_percentage, 80.0);
        assert_eq!(report.items[0].class, AbcClass::A);
    }

    #[test]
    fn zero_total_value_puts_everything_in_c() {
        let report = classify(vec![item(0.0, 10), item(3.0, 0)], &AbcThresholds::default());
        assert!(report.items.iter().all(|i| i.class == AbcClass::C && i.percentage == 0.0));
        assert_eq!(report.summary(AbcClass::C).map(|s| s.count), Some(2));
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let report = classify(Vec::new(), &AbcThresholds::default());
        assert_eq!(report.total_items, 0);
        assert_eq!(report.classes.len(), 3);
    }

    proptest! {
        /// Property: class counts partition the item list and class shares sum to 100%.
        #[test]
        fn classes_partition_items(
            rows in prop::collection::vec((0.0f64..500.0, 0u64..1_000), 0..40)
        ) {
            let report = classify(
                rows.into_iter().map(|(p, s)| item(p, s)),
                &AbcThresholds::default(),
            );
            let count: usize = report.classes.iter().map(|c| c.count).sum();
            prop_assert_eq!(count, report.total_items);

            if report.total_value > 0.0 {
                let pct: f64 = report.classes.iter().map(|c| c.percentage).sum();
                prop_assert!((pct - 100.0).abs() < 1e-6);
            }
        }
    }
}
