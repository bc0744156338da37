//! Inventory ledger
//!
//! Tracks per-product stock and exposes the atomic reserve/release pair
//! that checkout builds on.

mod ledger;

pub use ledger::InventoryLedger;
