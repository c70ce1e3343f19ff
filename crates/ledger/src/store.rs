use std::sync::{Arc, RwLock};

use stockbook_core::{DomainError, DomainResult};

use crate::balance::BalanceKey;
use crate::movement::StockMovement;

/// Append-only movement store.
///
/// The ledger is the source of truth for all balances; implementations must
/// never mutate or drop entries. `append_batch` is the transactional unit:
/// every entry in the batch becomes visible, or none does.
pub trait MovementStore: Send + Sync {
    /// Append a batch atomically (all entries or none).
    fn append_batch(&self, entries: Vec<StockMovement>) -> DomainResult<()>;

    /// All entries for one (warehouse, product) key, in append order.
    fn for_key(&self, key: BalanceKey) -> DomainResult<Vec<StockMovement>>;

    /// The full ledger, in append order.
    fn all(&self) -> DomainResult<Vec<StockMovement>>;
}

impl<S> MovementStore for Arc<S>
where
    S: MovementStore + ?Sized,
{
    fn append_batch(&self, entries: Vec<StockMovement>) -> DomainResult<()> {
        (**self).append_batch(entries)
    }

    fn for_key(&self, key: BalanceKey) -> DomainResult<Vec<StockMovement>> {
        (**self).for_key(key)
    }

    fn all(&self) -> DomainResult<Vec<StockMovement>> {
        (**self).all()
    }
}

/// In-memory append-only movement store.
///
/// Intended for tests/dev and embedding. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryMovementStore {
    entries: RwLock<Vec<StockMovement>>,
}

impl InMemoryMovementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MovementStore for InMemoryMovementStore {
    fn append_batch(&self, entries: Vec<StockMovement>) -> DomainResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        for (idx, entry) in entries.iter().enumerate() {
            if entry.delta == 0 {
                return Err(DomainError::validation(format!(
                    "batch contains zero delta (index {idx})"
                )));
            }
        }

        let mut log = self
            .entries
            .write()
            .map_err(|_| DomainError::storage("movement store lock poisoned"))?;
        log.extend(entries);
        Ok(())
    }

    fn for_key(&self, key: BalanceKey) -> DomainResult<Vec<StockMovement>> {
        let log = self
            .entries
            .read()
            .map_err(|_| DomainError::storage("movement store lock poisoned"))?;
        Ok(log.iter().filter(|m| m.key() == key).cloned().collect())
    }

    fn all(&self) -> DomainResult<Vec<StockMovement>> {
        let log = self
            .entries
            .read()
            .map_err(|_| DomainError::storage("movement store lock poisoned"))?;
        Ok(log.clone())
    }
}
