//! `stockbook-ledger` — the Movement Ledger, Balance Store and Transfer
//! Orchestrator.
//!
//! The ledger is an append-only log of stock-changing events and the single
//! source of truth; balances are a derived cache updated inside the same
//! per-key exclusive section as the append, and rebuildable from the log
//! alone. Transfers commit both legs as one batch under two ordered key
//! locks.

pub mod balance;
pub mod config;
pub mod ledger;
pub mod locks;
pub mod movement;
pub mod store;
pub mod transfer;

pub use balance::{BalanceCache, BalanceKey};
pub use config::{BackorderPolicy, LedgerConfig};
pub use ledger::{BalanceMismatch, MovementLedger, RecordMovement, Recorded};
pub use locks::{KeyGuard, KeyLocks};
pub use movement::{MovementKind, StockMovement};
pub use store::{InMemoryMovementStore, MovementStore};
pub use transfer::TransferReceipt;
