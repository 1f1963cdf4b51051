use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloomstock_core::{BatchId, FlowerId};
use bloomstock_inventory::{Batch, BatchState};

/// An active batch that has expired or will within the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiringBatch {
    pub batch_id: BatchId,
    pub flower_id: FlowerId,
    pub quantity_at_risk: u64,
    pub expires_at: DateTime<Utc>,
    /// Negative once past expiry.
    pub days_remaining: i64,
    pub expired: bool,
}

/// Active batches expiring within `horizon_days` of `as_of`, soonest first.
///
/// This is reporting only; the canonical stock figure comes from the ledger.
pub fn expiring_batches<'a>(
    batches: impl IntoIterator<Item = &'a Batch>,
    as_of: DateTime<Utc>,
    horizon_days: i64,
) -> Vec<ExpiringBatch> {
    let mut out: Vec<ExpiringBatch> = batches
        .into_iter()
        .filter(|b| b.state == BatchState::Active && b.quantity_passed > 0)
        .filter_map(|b| {
            let days_remaining = b.days_until_expiry(as_of);
            if days_remaining > horizon_days {
                return None;
            }
            Some(ExpiringBatch {
                batch_id: b.id,
                flower_id: b.flower_id,
                quantity_at_risk: b.quantity_passed,
                expires_at: b.expires_at,
                days_remaining,
                expired: b.expires_at <= as_of,
            })
        })
        .collect();

    out.sort_by(|a, b| a.expires_at.cmp(&b.expires_at).then_with(|| a.batch_id.cmp(&b.batch_id)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn active_batch(received_days_ago: i64, shelf_life: u32, as_of: DateTime<Utc>) -> Batch {
        let mut b = Batch::receive(
            BatchId::new(),
            FlowerId::new(),
            20,
            as_of - Duration::days(received_days_ago),
            shelf_life,
        )
        .unwrap();
        b.inspect(18, "ok", b.received_at).unwrap();
        b.transition(BatchState::Active).unwrap();
        b
    }

    #[test]
    fn reports_expired_and_soon_expiring_batches() {
        let as_of = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        let expired = active_batch(10, 7, as_of); // expired 3 days ago
        let soon = active_batch(5, 7, as_of); // 2 days left
        let fresh = active_batch(0, 14, as_of); // 14 days left

        let report = expiring_batches([&fresh, &soon, &expired], as_of, 3);
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].batch_id, expired.id);
        assert!(report[0].expired);
        assert_eq!(report[0].days_remaining, -3);
        assert_eq!(report[1].batch_id, soon.id);
        assert_eq!(report[1].quantity_at_risk, 18);
        assert!(!report[1].expired);
    }
}
