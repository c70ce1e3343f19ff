use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stockbook_access::{Actor, Operation, authorize, is_allowed};
use stockbook_alerts::{
    InMemoryNotificationBus, Notification, NotificationBus, Subscription, evaluate_low_stock,
};
use stockbook_audit::{AuditReconciler, Discrepancy, InventoryCheck, Resolution};
use stockbook_catalog::{
    CatalogRegistry, NewProduct, NewWarehouse, Product, ProductUpdate, Warehouse, WarehouseUpdate,
};
use stockbook_core::{CheckId, DiscrepancyId, DomainError, DomainResult, ProductId, WarehouseId};
use stockbook_ledger::{
    BalanceKey, BalanceMismatch, InMemoryMovementStore, MovementKind, MovementLedger,
    MovementStore, RecordMovement, Recorded, StockMovement, TransferReceipt,
};

use crate::audit_log::{AuditEntry, AuditTrail};
use crate::config::EngineConfig;

/// One line of the low-stock report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockEntry {
    pub warehouse: WarehouseId,
    pub product: ProductId,
    pub sku: String,
    pub balance: i64,
    pub threshold: u64,
}

/// The operation surface of the core, composed gate-first:
/// authorize → component → balance cache → monitor → notification bus.
///
/// Generic over the movement store (swap the in-memory log for a durable
/// backend) and the notification bus (swap the in-process fan-out for a
/// queue).
#[derive(Debug)]
pub struct InventoryEngine<S = InMemoryMovementStore, B = InMemoryNotificationBus> {
    catalog: Arc<CatalogRegistry>,
    ledger: Arc<MovementLedger<S>>,
    reconciler: AuditReconciler<S>,
    bus: B,
    trail: AuditTrail,
}

impl InventoryEngine {
    /// Engine backed entirely by in-memory stores.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(
            InMemoryMovementStore::new(),
            InMemoryNotificationBus::new(),
            config,
        )
    }
}

impl Default for InventoryEngine {
    fn default() -> Self {
        Self::in_memory(EngineConfig::default())
    }
}

impl<S: MovementStore, B: NotificationBus> InventoryEngine<S, B> {
    pub fn new(store: S, bus: B, config: EngineConfig) -> Self {
        let catalog = Arc::new(CatalogRegistry::new());
        let ledger = Arc::new(MovementLedger::new(
            store,
            Arc::clone(&catalog),
            config.ledger(),
        ));
        let reconciler = AuditReconciler::new(Arc::clone(&ledger), Arc::clone(&catalog));
        Self {
            catalog,
            ledger,
            reconciler,
            bus,
            trail: AuditTrail::new(),
        }
    }

    // ── access ──────────────────────────────────────────────────────────

    /// Gate check without side effects, exposed for UI hinting.
    pub fn authorize(&self, actor: &Actor, operation: Operation) -> bool {
        is_allowed(actor.role, operation)
    }

    // ── catalog management ──────────────────────────────────────────────

    pub fn create_warehouse(&self, actor: &Actor, new: NewWarehouse) -> DomainResult<Warehouse> {
        authorize(actor, Operation::WarehouseCreate)?;
        let warehouse = self.catalog.create_warehouse(new)?;
        self.trail.record(
            actor.id,
            Operation::WarehouseCreate,
            format!("warehouse {}", warehouse.id),
        );
        Ok(warehouse)
    }

    pub fn update_warehouse(
        &self,
        actor: &Actor,
        id: WarehouseId,
        update: WarehouseUpdate,
    ) -> DomainResult<Warehouse> {
        authorize(actor, Operation::WarehouseEdit)?;
        let warehouse = self.catalog.update_warehouse(id, update)?;
        self.trail
            .record(actor.id, Operation::WarehouseEdit, format!("warehouse {id}"));
        Ok(warehouse)
    }

    pub fn delete_warehouse(&self, actor: &Actor, id: WarehouseId) -> DomainResult<()> {
        authorize(actor, Operation::WarehouseDelete)?;
        self.catalog.delete_warehouse(id)?;
        self.trail.record(
            actor.id,
            Operation::WarehouseDelete,
            format!("warehouse {id}"),
        );
        Ok(())
    }

    pub fn create_product(&self, actor: &Actor, new: NewProduct) -> DomainResult<Product> {
        authorize(actor, Operation::ProductCreate)?;
        let product = self.catalog.create_product(new)?;
        self.trail.record(
            actor.id,
            Operation::ProductCreate,
            format!("product {}", product.id),
        );
        Ok(product)
    }

    pub fn update_product(
        &self,
        actor: &Actor,
        id: ProductId,
        update: ProductUpdate,
    ) -> DomainResult<Product> {
        authorize(actor, Operation::ProductEdit)?;
        let product = self.catalog.update_product(id, update)?;
        self.trail
            .record(actor.id, Operation::ProductEdit, format!("product {id}"));
        Ok(product)
    }

    pub fn set_min_stock(
        &self,
        actor: &Actor,
        id: ProductId,
        min_stock: u64,
    ) -> DomainResult<Product> {
        authorize(actor, Operation::ProductEdit)?;
        let product = self.catalog.set_min_stock(id, min_stock)?;
        self.trail.record(
            actor.id,
            Operation::ProductEdit,
            format!("product {id} min_stock={min_stock}"),
        );
        Ok(product)
    }

    pub fn delete_product(&self, actor: &Actor, id: ProductId) -> DomainResult<()> {
        authorize(actor, Operation::ProductDelete)?;
        self.catalog.delete_product(id)?;
        self.trail
            .record(actor.id, Operation::ProductDelete, format!("product {id}"));
        Ok(())
    }

    pub fn warehouse(&self, id: WarehouseId) -> DomainResult<Warehouse> {
        self.catalog.warehouse(id)
    }

    pub fn warehouses(&self) -> Vec<Warehouse> {
        self.catalog.warehouses()
    }

    pub fn product(&self, id: ProductId) -> DomainResult<Product> {
        self.catalog.product(id)
    }

    pub fn products(&self) -> Vec<Product> {
        self.catalog.products()
    }

    // ── movements & transfers ───────────────────────────────────────────

    /// Record an inbound receipt or outbound issue.
    ///
    /// Transfer legs only exist through [`Self::transfer`], corrections only
    /// through [`Self::resolve_discrepancy`]; both are rejected here so the
    /// pairing invariants cannot be bypassed.
    pub fn record_movement(
        &self,
        actor: &Actor,
        warehouse: WarehouseId,
        product: ProductId,
        delta: i64,
        kind: MovementKind,
    ) -> DomainResult<Recorded> {
        authorize(actor, Operation::MovementRecord)?;
        match kind {
            MovementKind::TransferLeg => {
                return Err(DomainError::validation(
                    "transfer legs are recorded via transfer",
                ));
            }
            MovementKind::Correction => {
                return Err(DomainError::validation(
                    "corrections are issued via discrepancy resolution",
                ));
            }
            MovementKind::Receipt | MovementKind::Issue => {}
        }

        let recorded = self.ledger.record(RecordMovement {
            warehouse,
            product,
            delta,
            kind,
            actor: actor.id,
            correlation: None,
        })?;
        self.notify_balance_change(recorded.key, recorded.previous, recorded.current);
        self.trail.record(
            actor.id,
            Operation::MovementRecord,
            format!("movement {}", recorded.movement),
        );
        Ok(recorded)
    }

    /// Current balance; zero when no movements exist.
    pub fn get_balance(&self, warehouse: WarehouseId, product: ProductId) -> i64 {
        self.ledger.balance(warehouse, product)
    }

    /// Atomically move stock between two warehouses.
    pub fn transfer(
        &self,
        actor: &Actor,
        source: WarehouseId,
        dest: WarehouseId,
        product: ProductId,
        quantity: i64,
    ) -> DomainResult<TransferReceipt> {
        authorize(actor, Operation::TransferInitiate)?;
        let receipt = self
            .ledger
            .transfer(actor.id, source, dest, product, quantity)?;

        // Only the debit side can cross a threshold downwards.
        self.notify_balance_change(
            BalanceKey::new(source, product),
            receipt.source_balance + receipt.quantity,
            receipt.source_balance,
        );
        self.trail.record(
            actor.id,
            Operation::TransferInitiate,
            format!("transfer {}", receipt.correlation),
        );
        Ok(receipt)
    }

    pub fn movements_for(
        &self,
        warehouse: WarehouseId,
        product: ProductId,
    ) -> DomainResult<Vec<StockMovement>> {
        self.ledger.movements_for(warehouse, product)
    }

    /// Re-derive all balances from the ledger (maintenance entry point).
    pub fn rebuild_balances(&self) -> DomainResult<HashMap<BalanceKey, i64>> {
        self.ledger.rebuild_balances()
    }

    /// Compare cached balances against the ledger without mutating anything.
    pub fn verify_balances(&self) -> DomainResult<Vec<BalanceMismatch>> {
        self.ledger.verify_balances()
    }

    // ── inventory checks ────────────────────────────────────────────────

    pub fn open_inventory_check(
        &self,
        actor: &Actor,
        warehouse: WarehouseId,
    ) -> DomainResult<CheckId> {
        authorize(actor, Operation::InventoryCheckOpen)?;
        let check = self.reconciler.open(actor.id, warehouse)?;
        self.trail.record(
            actor.id,
            Operation::InventoryCheckOpen,
            format!("check {}", check.id),
        );
        Ok(check.id)
    }

    pub fn record_count(
        &self,
        actor: &Actor,
        check: CheckId,
        product: ProductId,
        quantity: u64,
    ) -> DomainResult<()> {
        authorize(actor, Operation::InventoryCheckOpen)?;
        self.reconciler.record_count(check, product, quantity)
    }

    /// Close the check; derived discrepancies are returned and each one is
    /// announced on the notification bus.
    pub fn close_inventory_check(
        &self,
        actor: &Actor,
        check: CheckId,
    ) -> DomainResult<Vec<Discrepancy>> {
        authorize(actor, Operation::InventoryCheckClose)?;
        let found = self.reconciler.close(check)?;
        for discrepancy in &found {
            self.publish(Notification::discrepancy_found(
                discrepancy.warehouse,
                discrepancy.product,
                discrepancy.check,
                discrepancy.id,
                discrepancy.delta,
            ));
        }
        self.trail.record(
            actor.id,
            Operation::InventoryCheckClose,
            format!("check {check} ({} discrepancies)", found.len()),
        );
        Ok(found)
    }

    pub fn resolve_discrepancy(
        &self,
        actor: &Actor,
        discrepancy: DiscrepancyId,
        resolution: Resolution,
    ) -> DomainResult<()> {
        authorize(actor, Operation::DiscrepancyResolve)?;
        let recorded = self.reconciler.resolve(actor.id, discrepancy, resolution)?;
        if let Some(recorded) = recorded {
            // A downward correction behaves like any other balance drop.
            self.notify_balance_change(recorded.key, recorded.previous, recorded.current);
        }
        self.trail.record(
            actor.id,
            Operation::DiscrepancyResolve,
            format!("discrepancy {discrepancy}"),
        );
        Ok(())
    }

    pub fn inventory_check(&self, id: CheckId) -> DomainResult<InventoryCheck> {
        self.reconciler.check(id)
    }

    pub fn discrepancy(&self, id: DiscrepancyId) -> DomainResult<Discrepancy> {
        self.reconciler.discrepancy(id)
    }

    pub fn discrepancies_for(&self, check: CheckId) -> DomainResult<Vec<Discrepancy>> {
        self.reconciler.discrepancies_for(check)
    }

    // ── reporting & observability ───────────────────────────────────────

    /// Every (warehouse, product) with ledger history whose balance sits
    /// below the product's threshold. Keys with no movements are absent:
    /// the report is balance-driven, not catalog-driven.
    pub fn low_stock_report(&self, actor: &Actor) -> DomainResult<Vec<LowStockEntry>> {
        authorize(actor, Operation::ReportView)?;

        let mut report = Vec::new();
        for (key, balance) in self.ledger.balances_snapshot() {
            let Ok(product) = self.catalog.product(key.product) else {
                continue;
            };
            if product.min_stock > 0 && balance < product.min_stock as i64 {
                report.push(LowStockEntry {
                    warehouse: key.warehouse,
                    product: product.id,
                    sku: product.sku.to_string(),
                    balance,
                    threshold: product.min_stock,
                });
            }
        }
        report.sort_by(|a, b| (a.warehouse, a.product).cmp(&(b.warehouse, b.product)));
        Ok(report)
    }

    pub fn audit_trail(&self) -> Vec<AuditEntry> {
        self.trail.entries()
    }

    /// Subscribe to emitted notifications (delivery worker seam).
    pub fn subscribe_notifications(&self) -> Subscription {
        self.bus.subscribe()
    }

    // ── internals ───────────────────────────────────────────────────────

    fn notify_balance_change(&self, key: BalanceKey, previous: i64, current: i64) {
        let Ok(product) = self.catalog.product(key.product) else {
            return;
        };
        if let Some(notification) = evaluate_low_stock(&product, key.warehouse, previous, current) {
            info!(
                warehouse = %key.warehouse,
                product = %key.product,
                balance = current,
                threshold = product.min_stock,
                "low-stock threshold crossed"
            );
            self.publish(notification);
        }
    }

    fn publish(&self, notification: Notification) {
        if let Err(error) = self.bus.publish(notification) {
            // The ledger write already committed; delivery is at-least-once
            // and the dispatcher can replay from the trail if it must.
            warn!(%error, "notification publish failed");
        }
    }
}
