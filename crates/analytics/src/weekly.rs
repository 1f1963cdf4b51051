//! Weekly bucketing of outbound ledger movements.

use chrono::{DateTime, Duration, Utc};

use bloomstock_inventory::{LedgerEntry, LedgerKind};

/// Outbound quantities bucketed into week bins over a lookback window.
///
/// Week `0` starts at `as_of - lookback_weeks`; the entry exactly at `as_of`
/// lands in the last bin. Only weeks with movement count as observations.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySeries {
    bins: Vec<f64>,
}

impl WeeklySeries {
    pub fn window_start(as_of: DateTime<Utc>, lookback_weeks: u32) -> DateTime<Utc> {
        as_of - Duration::weeks(i64::from(lookback_weeks))
    }

    /// Bucket the absolute quantity of every outbound entry in the window.
    ///
    /// Inbound and adjustment entries are ignored, as are entries outside
    /// `[as_of - lookback_weeks, as_of]`.
    pub fn from_outbound<'a>(
        entries: impl IntoIterator<Item = &'a LedgerEntry>,
        as_of: DateTime<Utc>,
        lookback_weeks: u32,
    ) -> Self {
        let weeks = lookback_weeks.max(1) as usize;
        let start = Self::window_start(as_of, lookback_weeks);
        let mut bins = vec![0.0; weeks];

        for entry in entries {
            if entry.kind != LedgerKind::Outbound {
                continue;
            }
            if entry.occurred_at < start || entry.occurred_at > as_of {
                continue;
            }
            let week = ((entry.occurred_at - start).num_days() / 7) as usize;
            bins[week.min(weeks - 1)] += entry.delta.unsigned_abs() as f64;
        }

        Self { bins }
    }

    pub fn from_bins(bins: Vec<f64>) -> Self {
        Self { bins }
    }

    /// All bins in week order, empty weeks included.
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Totals of the weeks that saw movement, in week order.
    pub fn observed(&self) -> Vec<f64> {
        self.bins.iter().copied().filter(|q| *q > 0.0).collect()
    }

    /// Observed totals sorted ascending.
    pub fn observed_sorted(&self) -> Vec<f64> {
        let mut totals = self.observed();
        totals.sort_by(f64::total_cmp);
        totals
    }

    pub fn non_empty_weeks(&self) -> usize {
        self.bins.iter().filter(|q| **q > 0.0).count()
    }

    /// Mean of the observed weeks (0 when nothing moved).
    pub fn observed_mean(&self) -> f64 {
        let observed = self.observed();
        if observed.is_empty() {
            return 0.0;
        }
        observed.iter().sum::<f64>() / observed.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomstock_core::{FlowerId, LedgerEntryId};
    use bloomstock_inventory::NewLedgerEntry;
    use chrono::TimeZone;

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn sale(flower: FlowerId, qty: u64, days_ago: i64) -> LedgerEntry {
        NewLedgerEntry::outbound(flower, qty, as_of() - Duration::days(days_ago), "sale")
            .commit(LedgerEntryId::new())
            .unwrap()
    }

    #[test]
    fn buckets_by_week_relative_to_window_start() {
        let flower = FlowerId::new();
        let entries = vec![
            sale(flower, 5, 83), // week 0
            sale(flower, 3, 80), // week 0
            sale(flower, 7, 1),  // week 11
            sale(flower, 2, 0),  // exactly at as_of -> last week
        ];

        let series = WeeklySeries::from_outbound(&entries, as_of(), 12);
        assert_eq!(series.bins().len(), 12);
        assert_eq!(series.bins()[0], 8.0);
        assert_eq!(series.bins()[11], 9.0);
        assert_eq!(series.non_empty_weeks(), 2);
    }

    #[test]
    fn ignores_non_outbound_and_out_of_window_entries() {
        let flower = FlowerId::new();
        let inbound = NewLedgerEntry::inbound(flower, None, 100, as_of(), "receipt")
            .commit(LedgerEntryId::new())
            .unwrap();
        let adjustment = NewLedgerEntry::adjustment(flower, -4, as_of(), "shrink")
            .commit(LedgerEntryId::new())
            .unwrap();
        let entries = vec![inbound, adjustment, sale(flower, 9, 90), sale(flower, 1, -1)];

        let series = WeeklySeries::from_outbound(&entries, as_of(), 12);
        assert_eq!(series.non_empty_weeks(), 0);
        assert_eq!(series.observed_mean(), 0.0);
    }
}
