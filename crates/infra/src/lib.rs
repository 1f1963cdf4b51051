//! `bloomstock-infra`
//!
//! Storage boundary and orchestration around the pure analytics crate:
//! ledger stores, the stock aggregator, the parallel snapshot pass, the
//! snapshot cache, configuration and the service facade.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod service;
pub mod snapshot;
pub mod stock;
pub mod store;

#[cfg(test)]
mod testing;

pub use cache::{SnapshotCache, SnapshotKey};
pub use config::{AnalyticsConfig, CacheConfig, ConfigError, DatabaseConfig, PassConfig};
pub use engine::AnalyticsEngine;
pub use error::{ActionResult, ErrorDetail, ServiceError};
pub use service::{InspectionOutcome, InventoryAnalyticsService};
pub use snapshot::{DemandAnalysisRow, ExcludedItem, InventorySnapshot, SnapshotPass, SnapshotRow};
pub use stock::{StockAggregator, reduce_stock};
pub use store::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore, StoreError};
