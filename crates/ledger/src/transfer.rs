//! Atomic two-warehouse transfers.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use stockbook_core::{ActorId, CorrelationId, DomainError, DomainResult, MovementId, ProductId, WarehouseId};

use crate::balance::BalanceKey;
use crate::config::BackorderPolicy;
use crate::ledger::MovementLedger;
use crate::movement::{MovementKind, StockMovement};
use crate::store::MovementStore;

/// Outcome of a committed transfer: both leg ids plus the balances left at
/// either end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub correlation: CorrelationId,
    pub debit: MovementId,
    pub credit: MovementId,
    pub quantity: i64,
    pub source_balance: i64,
    pub dest_balance: i64,
}

impl<S: MovementStore> MovementLedger<S> {
    /// Move `quantity` of a product between two warehouses as one atomic
    /// unit: a debit leg at the source and a credit leg at the destination,
    /// sharing a correlation id. Either both legs commit or neither does.
    ///
    /// The two key locks are taken in the deterministic global key order
    /// (never call order), so opposing concurrent transfers cannot deadlock;
    /// acquisition is bounded and fails with `Busy` before anything is
    /// written. Failed transfers are not retried here; the error says
    /// whether a resubmission is safe.
    pub fn transfer(
        &self,
        actor: ActorId,
        source: WarehouseId,
        dest: WarehouseId,
        product: ProductId,
        quantity: i64,
    ) -> DomainResult<TransferReceipt> {
        if source == dest {
            return Err(DomainError::validation(
                "source and destination warehouses must differ",
            ));
        }
        if quantity <= 0 {
            return Err(DomainError::validation("transfer quantity must be positive"));
        }
        self.catalog().ensure_active_warehouse(source)?;
        self.catalog().ensure_active_warehouse(dest)?;
        self.catalog().ensure_active_product(product)?;

        let source_key = BalanceKey::new(source, product);
        let dest_key = BalanceKey::new(dest, product);
        let correlation = CorrelationId::new();

        let (_source_section, _dest_section) =
            self.locks()
                .acquire_pair(source_key, dest_key, self.config().lock_timeout)?;

        let available = self.balances().get(source_key);
        if self.config().backorder_policy == BackorderPolicy::Deny && available < quantity {
            return Err(DomainError::InsufficientStock {
                warehouse: source,
                product,
                available,
                requested: quantity,
            });
        }

        let now = Utc::now();
        let debit = StockMovement::new(
            source,
            product,
            -quantity,
            MovementKind::TransferLeg,
            actor,
            Some(correlation),
            now,
        );
        let credit = StockMovement::new(
            dest,
            product,
            quantity,
            MovementKind::TransferLeg,
            actor,
            Some(correlation),
            now,
        );
        let (debit_id, credit_id) = (debit.id, credit.id);

        // One batch: the store makes both legs visible or neither. Balances
        // are only touched after the batch committed, inside both sections.
        self.store().append_batch(vec![debit, credit])?;
        let source_balance = self.balances().apply_delta(source_key, -quantity);
        let dest_balance = self.balances().apply_delta(dest_key, quantity);

        info!(
            correlation = %correlation,
            source = %source,
            dest = %dest,
            product = %product,
            quantity,
            source_balance,
            dest_balance,
            "transfer committed"
        );

        Ok(TransferReceipt {
            correlation,
            debit: debit_id,
            credit: credit_id,
            quantity,
            source_balance,
            dest_balance,
        })
    }
}
