//! `bloomstock-analytics`
//!
//! **Responsibility:** replenishment analytics over one item's ledger slice.
//!
//! Everything here is pure and deterministic:
//! - It performs no IO and never reads the wall clock (`as_of` is always passed in).
//! - It never mutates domain state.
//! - Identical inputs always produce identical outputs, so results can be cached
//!   and recomputed concurrently without coordination.

pub mod abc;
pub mod analysis;
pub mod demand;
pub mod error;
pub mod expiry;
pub mod policy;
pub mod replenishment;
pub mod safety_stock;
pub mod status;
pub mod variability;
pub mod weekly;
pub mod zscore;

pub use abc::{AbcClassSummary, AbcInput, AbcItem, AbcReport, classify};
pub use analysis::{ItemAnalysis, analyze_item};
pub use demand::{DemandEstimate, EstimateSource, estimate_weekly_demand};
pub use error::AnalyticsError;
pub use expiry::{ExpiringBatch, expiring_batches};
pub use policy::{AbcThresholds, AnalyticsPolicy, ClassDefaults, Clamp, UrgencyPolicy};
pub use replenishment::{Recommendation, ReplenishmentInput, ReplenishmentLevel, recommend};
pub use safety_stock::{SafetyStockInput, fallback_safety_stock, lead_time_weeks, safety_stock};
pub use status::{DemandPattern, StockStatus};
pub use variability::{VariabilityEstimate, estimate_std_dev, sample_std_dev};
pub use weekly::WeeklySeries;
pub use zscore::ZTable;
