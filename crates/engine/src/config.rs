use std::time::Duration;

use serde::{Deserialize, Serialize};

use stockbook_ledger::{BackorderPolicy, LedgerConfig};

/// Engine-wide configuration, deserializable so embedders can load it from
/// a file or environment layer of their choosing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether outbound stock may drive a balance negative.
    pub backorder_policy: BackorderPolicy,
    /// Budget for acquiring one balance-key lock.
    pub lock_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backorder_policy: BackorderPolicy::Deny,
            lock_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    pub(crate) fn ledger(&self) -> LedgerConfig {
        LedgerConfig {
            backorder_policy: self.backorder_policy,
            lock_timeout: self.lock_timeout,
        }
    }
}
