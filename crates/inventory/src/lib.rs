//! Perishable inventory domain module.
//!
//! This crate contains the catalog, batch and ledger records plus their
//! business rules, implemented purely as deterministic domain logic (no IO,
//! no HTTP, no storage).

pub mod batch;
pub mod flower;
pub mod ledger;

pub use batch::{Batch, BatchState};
pub use flower::{AbcClass, Flower};
pub use ledger::{LedgerEntry, LedgerKind, NewLedgerEntry};
