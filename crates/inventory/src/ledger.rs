use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloomstock_core::{BatchId, DomainError, DomainResult, FlowerId, LedgerEntryId};

/// Kind of stock-changing event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Goods entering sellable stock (always positive).
    Inbound,
    /// Sales and other consumption (always negative).
    Outbound,
    /// Manual corrections (either sign, never zero).
    Adjustment,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Inbound => "inbound",
            LedgerKind::Outbound => "outbound",
            LedgerKind::Adjustment => "adjustment",
        }
    }

    /// Whether `delta` carries the sign this kind requires.
    pub fn accepts(self, delta: i64) -> bool {
        match self {
            LedgerKind::Inbound => delta > 0,
            LedgerKind::Outbound => delta < 0,
            LedgerKind::Adjustment => delta != 0,
        }
    }
}

impl core::str::FromStr for LedgerKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(LedgerKind::Inbound),
            "outbound" => Ok(LedgerKind::Outbound),
            "adjustment" => Ok(LedgerKind::Adjustment),
            other => Err(DomainError::validation(
                "kind",
                format!("unknown ledger kind '{other}'"),
            )),
        }
    }
}

/// Immutable, append-only ledger record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub flower_id: FlowerId,
    pub batch_id: Option<BatchId>,
    pub delta: i64,
    pub kind: LedgerKind,
    pub occurred_at: DateTime<Utc>,
    pub reason: String,
}

/// A ledger entry before the store assigns it an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub flower_id: FlowerId,
    pub batch_id: Option<BatchId>,
    pub delta: i64,
    pub kind: LedgerKind,
    pub occurred_at: DateTime<Utc>,
    pub reason: String,
}

impl NewLedgerEntry {
    pub fn inbound(
        flower_id: FlowerId,
        batch_id: Option<BatchId>,
        quantity: u64,
        occurred_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            flower_id,
            batch_id,
            delta: i64::try_from(quantity).unwrap_or(i64::MAX),
            kind: LedgerKind::Inbound,
            occurred_at,
            reason: reason.into(),
        }
    }

    pub fn outbound(
        flower_id: FlowerId,
        quantity: u64,
        occurred_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            flower_id,
            batch_id: None,
            delta: -i64::try_from(quantity).unwrap_or(i64::MAX),
            kind: LedgerKind::Outbound,
            occurred_at,
            reason: reason.into(),
        }
    }

    pub fn adjustment(
        flower_id: FlowerId,
        delta: i64,
        occurred_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            flower_id,
            batch_id: None,
            delta,
            kind: LedgerKind::Adjustment,
            occurred_at,
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if !self.kind.accepts(self.delta) {
            return Err(DomainError::validation(
                "delta",
                format!(
                    "{} entries cannot carry a delta of {}",
                    self.kind.as_str(),
                    self.delta
                ),
            ));
        }
        if self.reason.trim().is_empty() {
            return Err(DomainError::validation("reason", "reason cannot be empty"));
        }
        Ok(())
    }

    /// Validate and freeze into a stored entry.
    pub fn commit(self, id: LedgerEntryId) -> DomainResult<LedgerEntry> {
        self.validate()?;
        Ok(LedgerEntry {
            id,
            flower_id: self.flower_id,
            batch_id: self.batch_id,
            delta: self.delta,
            kind: self.kind,
            occurred_at: self.occurred_at,
            reason: self.reason,
        })
    }
}
