//! `stockbook-audit` — the Audit Reconciler.
//!
//! Inventory-check sessions compare physical counts against ledger-derived
//! balances; mismatches become discrepancies, settled exactly once, with
//! corrections expressed as compensating ledger entries (never in-place
//! edits).

pub mod check;
pub mod discrepancy;
pub mod reconciler;

pub use check::{CheckStatus, InventoryCheck};
pub use discrepancy::{Discrepancy, DiscrepancyStatus, Resolution};
pub use reconciler::AuditReconciler;
