use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use stockbook_core::{ProductId, WarehouseId};

use crate::movement::StockMovement;

/// The unit of exclusivity for all balance writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub warehouse: WarehouseId,
    pub product: ProductId,
}

impl BalanceKey {
    pub fn new(warehouse: WarehouseId, product: ProductId) -> Self {
        Self { warehouse, product }
    }
}

impl core::fmt::Display for BalanceKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.warehouse, self.product)
    }
}

/// Cached balances per (warehouse, product).
///
/// Strictly a materialized view over the movement ledger: writes happen only
/// inside a ledger write section (after the corresponding entries were
/// appended), and the whole cache can be re-derived from the ledger alone.
#[derive(Debug, Default)]
pub struct BalanceCache {
    balances: RwLock<HashMap<BalanceKey, i64>>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance; zero when no movements exist for the key.
    pub fn get(&self, key: BalanceKey) -> i64 {
        self.balances.read().get(&key).copied().unwrap_or(0)
    }

    /// Apply one delta and return the new balance.
    ///
    /// Crate-private: only the ledger may call this, inside the key's
    /// exclusive section, after the entry was durably appended.
    pub(crate) fn apply_delta(&self, key: BalanceKey, delta: i64) -> i64 {
        let mut balances = self.balances.write();
        let balance = balances.entry(key).or_insert(0);
        *balance += delta;
        *balance
    }

    pub fn snapshot(&self) -> HashMap<BalanceKey, i64> {
        self.balances.read().clone()
    }

    pub(crate) fn replace(&self, rebuilt: HashMap<BalanceKey, i64>) {
        *self.balances.write() = rebuilt;
    }

    /// Derive balances from scratch by replaying movements.
    pub fn rebuild_from<'a>(
        movements: impl IntoIterator<Item = &'a StockMovement>,
    ) -> HashMap<BalanceKey, i64> {
        let mut balances: HashMap<BalanceKey, i64> = HashMap::new();
        for movement in movements {
            *balances.entry(movement.key()).or_insert(0) += movement.delta;
        }
        balances
    }
}
