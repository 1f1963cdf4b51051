//! Ledger/batch store boundary.
//!
//! The analytics engine only reads through this trait; the write side
//! (inspection completion, manual adjustment) appends through it too.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{LedgerStore, StoreError};
