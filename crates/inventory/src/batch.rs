use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use bloomstock_core::{BatchId, DomainError, DomainResult, FlowerId};

/// Lifecycle of a received batch.
///
/// `Received -> Inspected -> Active -> Expired | Discarded`. `Discarded` is also
/// reachable from `Received` and `Inspected` (rejected or damaged goods).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Received,
    Inspected,
    Active,
    Expired,
    Discarded,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Received => "received",
            BatchState::Inspected => "inspected",
            BatchState::Active => "active",
            BatchState::Expired => "expired",
            BatchState::Discarded => "discarded",
        }
    }

    pub fn can_transition_to(self, next: BatchState) -> bool {
        use BatchState::*;
        matches!(
            (self, next),
            (Received, Inspected)
                | (Inspected, Active)
                | (Active, Expired)
                | (Received | Inspected | Active, Discarded)
        )
    }
}

impl core::str::FromStr for BatchState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(BatchState::Received),
            "inspected" => Ok(BatchState::Inspected),
            "active" => Ok(BatchState::Active),
            "expired" => Ok(BatchState::Expired),
            "discarded" => Ok(BatchState::Discarded),
            other => Err(DomainError::validation(
                "state",
                format!("unknown batch state '{other}'"),
            )),
        }
    }
}

/// A goods receipt for a single flower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub flower_id: FlowerId,
    pub quantity_received: u64,
    /// Units that passed inspection; zero until inspected.
    pub quantity_passed: u64,
    pub received_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub state: BatchState,
    pub inspected_at: Option<DateTime<Utc>>,
    pub inspection_note: Option<String>,
}

impl Batch {
    /// Record a goods receipt. Expiry is derived from the flower's shelf life.
    pub fn receive(
        id: BatchId,
        flower_id: FlowerId,
        quantity_received: u64,
        received_at: DateTime<Utc>,
        shelf_life_days: u32,
    ) -> DomainResult<Self> {
        if quantity_received == 0 {
            return Err(DomainError::validation(
                "quantity_received",
                "received quantity must be positive",
            ));
        }

        Ok(Self {
            id,
            flower_id,
            quantity_received,
            quantity_passed: 0,
            received_at,
            expires_at: received_at + Duration::days(i64::from(shelf_life_days)),
            state: BatchState::Received,
            inspected_at: None,
            inspection_note: None,
        })
    }

    /// Apply the inspection result. Allowed exactly once, from `Received`.
    pub fn inspect(
        &mut self,
        passed: u64,
        note: &str,
        inspected_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if note.trim().is_empty() {
            return Err(DomainError::validation("note", "inspection note cannot be empty"));
        }
        if passed == 0 {
            return Err(DomainError::validation(
                "passed_qty",
                "passed quantity must be positive",
            ));
        }
        if passed > self.quantity_received {
            return Err(DomainError::validation(
                "passed_qty",
                format!(
                    "passed quantity {passed} exceeds received quantity {}",
                    self.quantity_received
                ),
            ));
        }
        self.transition(BatchState::Inspected)?;

        self.quantity_passed = passed;
        self.inspected_at = Some(inspected_at);
        self.inspection_note = Some(note.trim().to_string());
        Ok(())
    }

    pub fn transition(&mut self, next: BatchState) -> DomainResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "batch {} cannot move from {} to {}",
                self.id,
                self.state.as_str(),
                next.as_str()
            )));
        }
        self.state = next;
        Ok(())
    }

    /// `(passed, received)` once inspected; `None` before inspection.
    pub fn inspection_counts(&self) -> Option<(u64, u64)> {
        self.inspected_at
            .map(|_| (self.quantity_passed, self.quantity_received))
    }

    /// Whole days until expiry, negative once expired.
    pub fn days_until_expiry(&self, as_of: DateTime<Utc>) -> i64 {
        (self.expires_at - as_of).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn received(qty: u64) -> Batch {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        Batch::receive(BatchId::new(), FlowerId::new(), qty, at, 5).unwrap()
    }

    #[test]
    fn receive_derives_expiry_from_shelf_life() {
        let batch = received(50);
        assert_eq!(batch.state, BatchState::Received);
        assert_eq!(batch.expires_at - batch.received_at, Duration::days(5));
        assert_eq!(batch.inspection_counts(), None);
    }

    #[test]
    fn inspection_moves_batch_to_inspected() {
        let mut batch = received(50);
        batch.inspect(40, "minor bruising", Utc::now()).unwrap();
        assert_eq!(batch.state, BatchState::Inspected);
        assert_eq!(batch.quantity_passed, 40);
        assert_eq!(batch.inspection_counts(), Some((40, 50)));
    }

    #[test]
    fn over_quantity_inspection_is_rejected() {
        let mut batch = received(50);
        let err = batch.inspect(51, "ok", Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "passed_qty"));
        assert_eq!(batch.state, BatchState::Received);
    }

    #[test]
    fn empty_note_is_rejected() {
        let mut batch = received(10);
        assert!(batch.inspect(5, "   ", Utc::now()).is_err());
    }

    #[test]
    fn second_inspection_violates_lifecycle() {
        let mut batch = received(10);
        batch.inspect(5, "first", Utc::now()).unwrap();
        let err = batch.inspect(5, "again", Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn terminal_states_do_not_transition() {
        for next in [
            BatchState::Received,
            BatchState::Inspected,
            BatchState::Active,
            BatchState::Expired,
            BatchState::Discarded,
        ] {
            assert!(!BatchState::Expired.can_transition_to(next));
            assert!(!BatchState::Discarded.can_transition_to(next));
        }
    }

    proptest! {
        /// Property: a successful inspection never leaves passed > received.
        #[test]
        fn passed_never_exceeds_received(received_qty in 1u64..10_000, passed in 0u64..20_000) {
            let mut batch = received(received_qty);
            let _ = batch.inspect(passed, "checked", Utc::now());
            prop_assert!(batch.quantity_passed <= batch.quantity_received);
        }
    }
}
