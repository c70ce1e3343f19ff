use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::info;

use stockbook_catalog::CatalogRegistry;
use stockbook_core::{
    ActorId, CheckId, CorrelationId, DiscrepancyId, DomainError, DomainResult, ProductId,
    WarehouseId,
};
use stockbook_ledger::{
    InMemoryMovementStore, MovementKind, MovementLedger, MovementStore, RecordMovement, Recorded,
};

use crate::check::InventoryCheck;
use crate::discrepancy::{Discrepancy, DiscrepancyStatus, Resolution};

#[derive(Debug, Default)]
struct AuditState {
    checks: HashMap<CheckId, InventoryCheck>,
    open_by_warehouse: HashMap<WarehouseId, CheckId>,
    discrepancies: HashMap<DiscrepancyId, Discrepancy>,
}

/// The Audit Reconciler: compares physical counts against ledger-derived
/// balances and settles the differences.
///
/// At most one check is open per warehouse at a time. Checks do NOT block
/// movements or transfers on that warehouse; discrepancies are computed
/// against the balance at the instant of close.
#[derive(Debug)]
pub struct AuditReconciler<S = InMemoryMovementStore> {
    ledger: Arc<MovementLedger<S>>,
    catalog: Arc<CatalogRegistry>,
    state: RwLock<AuditState>,
}

impl<S: MovementStore> AuditReconciler<S> {
    pub fn new(ledger: Arc<MovementLedger<S>>, catalog: Arc<CatalogRegistry>) -> Self {
        Self {
            ledger,
            catalog,
            state: RwLock::new(AuditState::default()),
        }
    }

    /// Open a counting session. Fails with `Conflict` while another check is
    /// open for the same warehouse. Counting against a moving target is
    /// what the exclusivity avoids.
    pub fn open(&self, actor: ActorId, warehouse: WarehouseId) -> DomainResult<InventoryCheck> {
        self.catalog.ensure_active_warehouse(warehouse)?;

        let mut state = self.write_state()?;
        if let Some(existing) = state.open_by_warehouse.get(&warehouse) {
            return Err(DomainError::conflict(format!(
                "inventory check {existing} is already open for warehouse {warehouse}"
            )));
        }

        let check = InventoryCheck::open(warehouse, actor);
        state.open_by_warehouse.insert(warehouse, check.id);
        state.checks.insert(check.id, check.clone());

        info!(check = %check.id, warehouse = %warehouse, "inventory check opened");
        Ok(check)
    }

    /// Record a counted quantity. Last write wins while the check is open.
    pub fn record_count(
        &self,
        check: CheckId,
        product: ProductId,
        counted: u64,
    ) -> DomainResult<()> {
        self.catalog.ensure_active_product(product)?;

        let mut state = self.write_state()?;
        let session = state
            .checks
            .get_mut(&check)
            .ok_or_else(|| DomainError::not_found(format!("inventory check {check}")))?;
        session.record_count(product, counted)
    }

    /// Close the session and derive discrepancies. Terminal: the check takes
    /// no further counts. Closing never mutates the ledger itself.
    pub fn close(&self, check: CheckId) -> DomainResult<Vec<Discrepancy>> {
        let mut state = self.write_state()?;

        let (warehouse, counts) = {
            let session = state
                .checks
                .get_mut(&check)
                .ok_or_else(|| DomainError::not_found(format!("inventory check {check}")))?;
            session.close()?;
            (session.warehouse, session.counts.clone())
        };

        let mut found = Vec::new();
        for (product, counted) in counts {
            let expected = self.ledger.balance(warehouse, product);
            if counted as i64 != expected {
                found.push(Discrepancy::new(check, warehouse, product, counted, expected));
            }
        }
        for discrepancy in &found {
            state.discrepancies.insert(discrepancy.id, discrepancy.clone());
        }
        state.open_by_warehouse.remove(&warehouse);

        info!(
            check = %check,
            warehouse = %warehouse,
            discrepancies = found.len(),
            "inventory check closed"
        );
        Ok(found)
    }

    /// Settle one discrepancy, exactly once.
    ///
    /// `Corrected` issues a compensating correction entry through the ledger
    /// (correlation id derived from the discrepancy id) so the balance lands
    /// on the counted quantity; `AcceptedAsIs` records the decision without
    /// touching the ledger. Returns the correction's record, if one was made,
    /// so callers can feed the monitor.
    pub fn resolve(
        &self,
        actor: ActorId,
        discrepancy: DiscrepancyId,
        resolution: Resolution,
    ) -> DomainResult<Option<Recorded>> {
        let mut state = self.write_state()?;
        let record = state
            .discrepancies
            .get_mut(&discrepancy)
            .ok_or_else(|| DomainError::not_found(format!("discrepancy {discrepancy}")))?;
        if !record.is_open() {
            return Err(DomainError::AlreadyResolved(discrepancy));
        }

        let recorded = match resolution {
            Resolution::AcceptedAsIs => None,
            Resolution::Corrected => Some(self.ledger.record(RecordMovement {
                warehouse: record.warehouse,
                product: record.product,
                delta: record.delta,
                kind: MovementKind::Correction,
                actor,
                correlation: Some(CorrelationId::from_uuid(*record.id.as_uuid())),
            })?),
        };

        record.status = match resolution {
            Resolution::Corrected => DiscrepancyStatus::Corrected,
            Resolution::AcceptedAsIs => DiscrepancyStatus::AcceptedAsIs,
        };
        record.resolved_at = Some(Utc::now());

        info!(
            discrepancy = %discrepancy,
            resolution = ?resolution,
            corrected = recorded.is_some(),
            "discrepancy resolved"
        );
        Ok(recorded)
    }

    pub fn check(&self, id: CheckId) -> DomainResult<InventoryCheck> {
        let state = self.read_state()?;
        state
            .checks
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("inventory check {id}")))
    }

    pub fn discrepancy(&self, id: DiscrepancyId) -> DomainResult<Discrepancy> {
        let state = self.read_state()?;
        state
            .discrepancies
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("discrepancy {id}")))
    }

    pub fn discrepancies_for(&self, check: CheckId) -> DomainResult<Vec<Discrepancy>> {
        let state = self.read_state()?;
        let mut found: Vec<_> = state
            .discrepancies
            .values()
            .filter(|d| d.check == check)
            .cloned()
            .collect();
        found.sort_by_key(|d| d.id);
        Ok(found)
    }

    pub fn open_check_for(&self, warehouse: WarehouseId) -> DomainResult<Option<CheckId>> {
        let state = self.read_state()?;
        Ok(state.open_by_warehouse.get(&warehouse).copied())
    }

    fn read_state(&self) -> DomainResult<std::sync::RwLockReadGuard<'_, AuditState>> {
        self.state
            .read()
            .map_err(|_| DomainError::storage("audit state lock poisoned"))
    }

    fn write_state(&self) -> DomainResult<std::sync::RwLockWriteGuard<'_, AuditState>> {
        self.state
            .write()
            .map_err(|_| DomainError::storage("audit state lock poisoned"))
    }
}
