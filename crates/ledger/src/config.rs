use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Whether outbound movements may drive a balance below zero.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackorderPolicy {
    /// Reject with `InsufficientStock` when the balance would go negative.
    #[default]
    Deny,
    /// Permit negative balances (backorders tracked outside the core).
    Allow,
}

/// Ledger tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub backorder_policy: BackorderPolicy,
    /// Budget for acquiring one key lock. Expiry surfaces `Busy` with
    /// nothing written; a transfer may spend up to twice this budget.
    pub lock_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backorder_policy: BackorderPolicy::Deny,
            lock_timeout: Duration::from_secs(5),
        }
    }
}
