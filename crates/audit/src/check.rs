use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{ActorId, CheckId, DomainError, DomainResult, ProductId, WarehouseId};

/// Lifecycle of an inventory check: `Open -> Closed`, closing is terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Open,
    Closed,
}

/// One physical counting session for a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryCheck {
    pub id: CheckId,
    pub warehouse: WarehouseId,
    pub opened_by: ActorId,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Counted quantity per product; last write wins while the check is open.
    pub counts: BTreeMap<ProductId, u64>,
    pub status: CheckStatus,
}

impl InventoryCheck {
    pub(crate) fn open(warehouse: WarehouseId, opened_by: ActorId) -> Self {
        Self {
            id: CheckId::new(),
            warehouse,
            opened_by,
            opened_at: Utc::now(),
            closed_at: None,
            counts: BTreeMap::new(),
            status: CheckStatus::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == CheckStatus::Open
    }

    pub(crate) fn record_count(&mut self, product: ProductId, counted: u64) -> DomainResult<()> {
        if !self.is_open() {
            return Err(DomainError::conflict(format!(
                "inventory check {} is closed",
                self.id
            )));
        }
        self.counts.insert(product, counted);
        Ok(())
    }

    pub(crate) fn close(&mut self) -> DomainResult<()> {
        if !self.is_open() {
            return Err(DomainError::conflict(format!(
                "inventory check {} is already closed",
                self.id
            )));
        }
        self.status = CheckStatus::Closed;
        self.closed_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_overwrite_while_open() {
        let mut check = InventoryCheck::open(WarehouseId::new(), ActorId::new());
        let product = ProductId::new();

        check.record_count(product, 10).unwrap();
        check.record_count(product, 12).unwrap();
        assert_eq!(check.counts[&product], 12);
    }

    #[test]
    fn closed_check_accepts_no_counts_and_no_second_close() {
        let mut check = InventoryCheck::open(WarehouseId::new(), ActorId::new());
        check.close().unwrap();
        assert!(check.closed_at.is_some());

        assert!(matches!(
            check.record_count(ProductId::new(), 1).unwrap_err(),
            DomainError::Conflict(_)
        ));
        assert!(matches!(check.close().unwrap_err(), DomainError::Conflict(_)));
    }
}
