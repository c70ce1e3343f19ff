//! End-to-end tests for the full pipeline:
//! gate → ledger → balance cache → monitor → notification bus.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use stockbook_access::{Actor, Operation, Role};
use stockbook_alerts::NotificationKind;
use stockbook_audit::{DiscrepancyStatus, Resolution};
use stockbook_catalog::{NewProduct, NewWarehouse, WarehouseKind};
use stockbook_core::{ActorId, CorrelationId, DomainError, ProductId, WarehouseId};
use stockbook_ledger::{BackorderPolicy, MovementKind, StockMovement};

use crate::{EngineConfig, InventoryEngine};

struct Setup {
    engine: InventoryEngine,
    admin: Actor,
    source: WarehouseId,
    dest: WarehouseId,
    product: ProductId,
}

fn actor(role: Role) -> Actor {
    Actor::new(ActorId::new(), role)
}

fn setup(policy: BackorderPolicy, min_stock: u64) -> Setup {
    let engine = InventoryEngine::in_memory(EngineConfig {
        backorder_policy: policy,
        ..EngineConfig::default()
    });
    let admin = actor(Role::Admin);

    let source = engine
        .create_warehouse(
            &admin,
            NewWarehouse {
                name: "North".to_string(),
                kind: WarehouseKind::Storage,
                location: "Row 1".to_string(),
            },
        )
        .unwrap()
        .id;
    let dest = engine
        .create_warehouse(
            &admin,
            NewWarehouse {
                name: "South".to_string(),
                kind: WarehouseKind::Retail,
                location: "Row 2".to_string(),
            },
        )
        .unwrap()
        .id;
    let product = engine
        .create_product(
            &admin,
            NewProduct {
                sku: "BLT-6".to_string(),
                name: "Bolt M6".to_string(),
                unit: "pcs".to_string(),
                category: Some("fasteners".to_string()),
                min_stock,
            },
        )
        .unwrap()
        .id;

    Setup {
        engine,
        admin,
        source,
        dest,
        product,
    }
}

#[test]
fn receipts_and_issues_flow_through_to_the_balance() -> Result<()> {
    let s = setup(BackorderPolicy::Deny, 0);

    s.engine
        .record_movement(&s.admin, s.source, s.product, 20, MovementKind::Receipt)?;
    s.engine
        .record_movement(&s.admin, s.source, s.product, -6, MovementKind::Issue)?;

    assert_eq!(s.engine.get_balance(s.source, s.product), 14);
    assert_eq!(s.engine.movements_for(s.source, s.product)?.len(), 2);
    assert!(s.engine.verify_balances()?.is_empty());
    Ok(())
}

#[test]
fn gate_denies_before_any_mutation() {
    let s = setup(BackorderPolicy::Deny, 0);
    s.engine
        .record_movement(&s.admin, s.source, s.product, 10, MovementKind::Receipt)
        .unwrap();

    let clerk = actor(Role::Clerk);
    let err = s
        .engine
        .transfer(&clerk, s.source, s.dest, s.product, 5)
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized { .. }));

    let analyst = actor(Role::Analyst);
    let err = s
        .engine
        .record_movement(&analyst, s.source, s.product, 5, MovementKind::Receipt)
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized { .. }));

    // Nothing beyond the admin's receipt ever reached the ledger.
    assert_eq!(s.engine.movements_for(s.source, s.product).unwrap().len(), 1);
    assert_eq!(s.engine.get_balance(s.source, s.product), 10);
}

#[test]
fn paired_kinds_cannot_be_recorded_directly() {
    let s = setup(BackorderPolicy::Deny, 0);

    for kind in [MovementKind::TransferLeg, MovementKind::Correction] {
        let err = s
            .engine
            .record_movement(&s.admin, s.source, s.product, 5, kind)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}

#[test]
fn low_stock_fires_on_the_crossing_and_rearms_after_recovery() -> Result<()> {
    let s = setup(BackorderPolicy::Deny, 5);
    let alerts = s.engine.subscribe_notifications();

    s.engine
        .record_movement(&s.admin, s.source, s.product, 10, MovementKind::Receipt)?;
    assert!(alerts.drain().is_empty());

    // 10 -> 4 crosses below the threshold of 5.
    s.engine
        .record_movement(&s.admin, s.source, s.product, -6, MovementKind::Issue)?;
    let fired = alerts.drain();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].kind, NotificationKind::LowStock);
    assert_eq!(fired[0].warehouse, s.source);
    assert_eq!(fired[0].product, s.product);

    // Still low: no re-fire.
    s.engine
        .record_movement(&s.admin, s.source, s.product, -1, MovementKind::Issue)?;
    assert!(alerts.drain().is_empty());

    // Recover to 6, then cross again: fires again.
    s.engine
        .record_movement(&s.admin, s.source, s.product, 3, MovementKind::Receipt)?;
    assert!(alerts.drain().is_empty());
    s.engine
        .record_movement(&s.admin, s.source, s.product, -3, MovementKind::Issue)?;
    assert_eq!(alerts.drain().len(), 1);
    Ok(())
}

#[test]
fn transfer_debit_can_trigger_low_stock() -> Result<()> {
    let s = setup(BackorderPolicy::Deny, 5);
    let alerts = s.engine.subscribe_notifications();

    s.engine
        .record_movement(&s.admin, s.source, s.product, 6, MovementKind::Receipt)?;
    s.engine.transfer(&s.admin, s.source, s.dest, s.product, 3)?;

    let fired = alerts.drain();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].warehouse, s.source);
    Ok(())
}

#[test]
fn transfer_round_trip_restores_balances() -> Result<()> {
    let s = setup(BackorderPolicy::Deny, 0);
    s.engine
        .record_movement(&s.admin, s.source, s.product, 10, MovementKind::Receipt)?;

    s.engine.transfer(&s.admin, s.source, s.dest, s.product, 4)?;
    assert_eq!(s.engine.get_balance(s.source, s.product), 6);
    assert_eq!(s.engine.get_balance(s.dest, s.product), 4);

    s.engine.transfer(&s.admin, s.dest, s.source, s.product, 4)?;
    assert_eq!(s.engine.get_balance(s.source, s.product), 10);
    assert_eq!(s.engine.get_balance(s.dest, s.product), 0);
    Ok(())
}

#[test]
fn backorder_policy_is_an_explicit_switch() {
    // Deny: an uncovered issue fails and writes nothing.
    let deny = setup(BackorderPolicy::Deny, 0);
    deny.engine
        .record_movement(&deny.admin, deny.source, deny.product, 3, MovementKind::Receipt)
        .unwrap();
    let err = deny
        .engine
        .record_movement(&deny.admin, deny.source, deny.product, -5, MovementKind::Issue)
        .unwrap_err();
    assert!(matches!(err, DomainError::InsufficientStock { .. }));
    assert_eq!(deny.engine.get_balance(deny.source, deny.product), 3);

    // Allow: the same operation commits and the balance goes negative.
    let allow = setup(BackorderPolicy::Allow, 0);
    allow
        .engine
        .record_movement(&allow.admin, allow.source, allow.product, 3, MovementKind::Receipt)
        .unwrap();
    allow
        .engine
        .record_movement(&allow.admin, allow.source, allow.product, -5, MovementKind::Issue)
        .unwrap();
    assert_eq!(allow.engine.get_balance(allow.source, allow.product), -2);
}

#[test]
fn check_close_resolve_reconciles_count_and_ledger() -> Result<()> {
    let s = setup(BackorderPolicy::Deny, 0);
    let alerts = s.engine.subscribe_notifications();
    s.engine
        .record_movement(&s.admin, s.source, s.product, 12, MovementKind::Receipt)?;

    let manager = actor(Role::WarehouseManager);
    let check = s.engine.open_inventory_check(&manager, s.source)?;

    // A second session for the same warehouse has to wait.
    let err = s
        .engine
        .open_inventory_check(&manager, s.source)
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    s.engine.record_count(&manager, check, s.product, 15)?;
    let found = s.engine.close_inventory_check(&manager, check)?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].delta, 3);

    let announced = alerts.drain();
    assert_eq!(announced.len(), 1);
    assert_eq!(announced[0].kind, NotificationKind::DiscrepancyFound);
    assert_eq!(announced[0].discrepancy, Some(found[0].id));

    s.engine
        .resolve_discrepancy(&manager, found[0].id, Resolution::Corrected)?;
    assert_eq!(s.engine.get_balance(s.source, s.product), 15);
    assert_eq!(
        s.engine.discrepancy(found[0].id)?.status,
        DiscrepancyStatus::Corrected
    );

    let err = s
        .engine
        .resolve_discrepancy(&manager, found[0].id, Resolution::AcceptedAsIs)
        .unwrap_err();
    assert!(matches!(err, DomainError::AlreadyResolved(_)));
    Ok(())
}

#[test]
fn audit_trail_records_successful_mutations() -> Result<()> {
    let s = setup(BackorderPolicy::Deny, 0);
    s.engine
        .record_movement(&s.admin, s.source, s.product, 10, MovementKind::Receipt)?;
    s.engine.transfer(&s.admin, s.source, s.dest, s.product, 2)?;

    let operations: Vec<Operation> = s
        .engine
        .audit_trail()
        .into_iter()
        .map(|entry| entry.operation)
        .collect();
    // Two warehouses + one product from setup, then the two mutations above.
    assert_eq!(
        operations,
        vec![
            Operation::WarehouseCreate,
            Operation::WarehouseCreate,
            Operation::ProductCreate,
            Operation::MovementRecord,
            Operation::TransferInitiate,
        ]
    );
    Ok(())
}

#[test]
fn denied_operations_leave_no_trail() {
    let s = setup(BackorderPolicy::Deny, 0);
    let before = s.engine.audit_trail().len();

    let clerk = actor(Role::Clerk);
    let _ = s.engine.delete_warehouse(&clerk, s.source);

    assert_eq!(s.engine.audit_trail().len(), before);
}

#[test]
fn low_stock_report_is_gated_and_lists_shortfalls() -> Result<()> {
    let s = setup(BackorderPolicy::Deny, 5);
    s.engine
        .record_movement(&s.admin, s.source, s.product, 3, MovementKind::Receipt)?;

    let clerk = actor(Role::Clerk);
    assert!(matches!(
        s.engine.low_stock_report(&clerk).unwrap_err(),
        DomainError::Unauthorized { .. }
    ));

    let analyst = actor(Role::Analyst);
    let report = s.engine.low_stock_report(&analyst)?;
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].warehouse, s.source);
    assert_eq!(report[0].balance, 3);
    assert_eq!(report[0].threshold, 5);
    Ok(())
}

#[test]
fn rebuild_from_ledger_reproduces_the_live_cache() -> Result<()> {
    let s = setup(BackorderPolicy::Deny, 0);
    s.engine
        .record_movement(&s.admin, s.source, s.product, 20, MovementKind::Receipt)?;
    s.engine.transfer(&s.admin, s.source, s.dest, s.product, 8)?;
    s.engine
        .record_movement(&s.admin, s.dest, s.product, -3, MovementKind::Issue)?;

    let before = (
        s.engine.get_balance(s.source, s.product),
        s.engine.get_balance(s.dest, s.product),
    );
    s.engine.rebuild_balances()?;
    let after = (
        s.engine.get_balance(s.source, s.product),
        s.engine.get_balance(s.dest, s.product),
    );
    assert_eq!(before, after);
    assert!(s.engine.verify_balances()?.is_empty());
    Ok(())
}

#[test]
fn concurrent_mixed_load_preserves_every_invariant() {
    let s = setup(BackorderPolicy::Deny, 0);
    s.engine
        .record_movement(&s.admin, s.source, s.product, 5_000, MovementKind::Receipt)
        .unwrap();
    s.engine
        .record_movement(&s.admin, s.dest, s.product, 5_000, MovementKind::Receipt)
        .unwrap();

    let engine = Arc::new(s.engine);
    let (admin, source, dest, product) = (s.admin, s.source, s.dest, s.product);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                for i in 0..50 {
                    match (t + i) % 4 {
                        0 => {
                            engine
                                .transfer(&admin, source, dest, product, 1)
                                .unwrap();
                        }
                        1 => {
                            engine
                                .transfer(&admin, dest, source, product, 1)
                                .unwrap();
                        }
                        2 => {
                            engine
                                .record_movement(&admin, source, product, 2, MovementKind::Receipt)
                                .unwrap();
                        }
                        _ => {
                            engine
                                .record_movement(&admin, dest, product, -1, MovementKind::Issue)
                                .unwrap();
                        }
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Cache and ledger agree on every key.
    assert!(engine.verify_balances().unwrap().is_empty());

    // Balances equal the ledger-derived sums.
    let mut movements: Vec<StockMovement> = engine.movements_for(source, product).unwrap();
    movements.extend(engine.movements_for(dest, product).unwrap());
    let total_delta: i64 = movements.iter().map(|m| m.delta).sum();
    assert_eq!(
        engine.get_balance(source, product) + engine.get_balance(dest, product),
        total_delta
    );

    // Every transfer correlation id covers exactly two legs summing to zero.
    let mut legs: HashMap<CorrelationId, Vec<i64>> = HashMap::new();
    for movement in movements
        .iter()
        .filter(|m| m.kind == MovementKind::TransferLeg)
    {
        legs.entry(movement.correlation.expect("transfer legs carry a correlation id"))
            .or_default()
            .push(movement.delta);
    }
    for (correlation, deltas) in legs {
        assert_eq!(deltas.len(), 2, "correlation {correlation} has a lone leg");
        assert_eq!(deltas.iter().sum::<i64>(), 0);
    }
}
