use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use stockbook_catalog::CatalogRegistry;
use stockbook_core::{ActorId, CorrelationId, DomainError, DomainResult, MovementId, ProductId, WarehouseId};

use crate::balance::{BalanceCache, BalanceKey};
use crate::config::{BackorderPolicy, LedgerConfig};
use crate::locks::KeyLocks;
use crate::movement::{MovementKind, StockMovement};
use crate::store::{InMemoryMovementStore, MovementStore};

/// Request to append one ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovement {
    pub warehouse: WarehouseId,
    pub product: ProductId,
    pub delta: i64,
    pub kind: MovementKind,
    pub actor: ActorId,
    pub correlation: Option<CorrelationId>,
}

/// Outcome of a successful append: the entry id plus the balance on either
/// side of it, so callers can drive edge-triggered monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recorded {
    pub movement: MovementId,
    pub key: BalanceKey,
    pub previous: i64,
    pub current: i64,
}

/// A cached balance that disagrees with the ledger-derived value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceMismatch {
    pub key: BalanceKey,
    pub cached: i64,
    pub derived: i64,
}

/// The Movement Ledger: append-only log of stock-changing events and the
/// cached balances derived from it.
///
/// Every write runs inside the key's exclusive section; the cached balance is
/// updated only after the entry was appended, in the same section, so the
/// ledger and the cache never disagree, including immediately after any
/// failure.
#[derive(Debug)]
pub struct MovementLedger<S = InMemoryMovementStore> {
    store: S,
    catalog: Arc<CatalogRegistry>,
    balances: BalanceCache,
    locks: KeyLocks,
    config: LedgerConfig,
}

impl<S: MovementStore> MovementLedger<S> {
    pub fn new(store: S, catalog: Arc<CatalogRegistry>, config: LedgerConfig) -> Self {
        Self {
            store,
            catalog,
            balances: BalanceCache::new(),
            locks: KeyLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub(crate) fn catalog(&self) -> &CatalogRegistry {
        &self.catalog
    }

    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn balances(&self) -> &BalanceCache {
        &self.balances
    }

    pub(crate) fn locks(&self) -> &KeyLocks {
        &self.locks
    }

    /// Append one entry and update the cached balance atomically.
    pub fn record(&self, request: RecordMovement) -> DomainResult<Recorded> {
        self.validate(&request)?;

        let key = BalanceKey::new(request.warehouse, request.product);
        let _section = self.locks.acquire(key, self.config.lock_timeout)?;
        self.apply_in_section(key, request)
    }

    fn validate(&self, request: &RecordMovement) -> DomainResult<()> {
        if request.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        match request.kind {
            MovementKind::Receipt if request.delta < 0 => {
                return Err(DomainError::validation("receipt delta must be positive"));
            }
            MovementKind::Issue if request.delta > 0 => {
                return Err(DomainError::validation("issue delta must be negative"));
            }
            _ => {}
        }
        self.catalog.ensure_active_warehouse(request.warehouse)?;
        self.catalog.ensure_active_product(request.product)?;
        Ok(())
    }

    /// Caller must hold the key's exclusive section.
    fn apply_in_section(&self, key: BalanceKey, request: RecordMovement) -> DomainResult<Recorded> {
        let previous = self.balances.get(key);
        self.ensure_cover(key, previous, &request)?;

        let movement = StockMovement::new(
            request.warehouse,
            request.product,
            request.delta,
            request.kind,
            request.actor,
            request.correlation,
            Utc::now(),
        );
        let id = movement.id;

        // Append first; the cache is only touched once the entry is durable,
        // so a store failure leaves both sides untouched.
        self.store.append_batch(vec![movement])?;
        let current = self.balances.apply_delta(key, request.delta);

        debug!(
            movement = %id,
            warehouse = %key.warehouse,
            product = %key.product,
            delta = request.delta,
            kind = %request.kind,
            previous,
            current,
            "movement recorded"
        );

        Ok(Recorded {
            movement: id,
            key,
            previous,
            current,
        })
    }

    fn ensure_cover(
        &self,
        key: BalanceKey,
        available: i64,
        request: &RecordMovement,
    ) -> DomainResult<()> {
        if request.delta < 0
            && request.kind.requires_cover()
            && self.config.backorder_policy == BackorderPolicy::Deny
            && available + request.delta < 0
        {
            return Err(DomainError::InsufficientStock {
                warehouse: key.warehouse,
                product: key.product,
                available,
                requested: -request.delta,
            });
        }
        Ok(())
    }

    /// Current cached balance; zero when no movements exist.
    pub fn balance(&self, warehouse: WarehouseId, product: ProductId) -> i64 {
        self.balances.get(BalanceKey::new(warehouse, product))
    }

    pub fn balances_snapshot(&self) -> HashMap<BalanceKey, i64> {
        self.balances.snapshot()
    }

    /// Entries for one key, sorted by id (append order).
    pub fn movements_for(
        &self,
        warehouse: WarehouseId,
        product: ProductId,
    ) -> DomainResult<Vec<StockMovement>> {
        let mut movements = self.store.for_key(BalanceKey::new(warehouse, product))?;
        movements.sort_by_key(|m| m.id);
        Ok(movements)
    }

    pub fn all_movements(&self) -> DomainResult<Vec<StockMovement>> {
        self.store.all()
    }

    /// Re-derive the whole cache from the ledger alone and swap it in.
    ///
    /// The ledger is authoritative; this is the reconciliation invariant of
    /// the system, exposed for startup and for correctness checks. Call it
    /// quiesced; it replaces the cache wholesale.
    pub fn rebuild_balances(&self) -> DomainResult<HashMap<BalanceKey, i64>> {
        let movements = self.store.all()?;
        let rebuilt = BalanceCache::rebuild_from(&movements);
        self.balances.replace(rebuilt.clone());
        Ok(rebuilt)
    }

    /// Compare cached balances against ledger-derived ones without mutating
    /// anything. An empty result means cache and ledger agree.
    pub fn verify_balances(&self) -> DomainResult<Vec<BalanceMismatch>> {
        let derived = BalanceCache::rebuild_from(&self.store.all()?);
        let cached = self.balances.snapshot();

        let mut mismatches = Vec::new();
        let keys: std::collections::BTreeSet<BalanceKey> =
            derived.keys().chain(cached.keys()).copied().collect();
        for key in keys {
            let cached_value = cached.get(&key).copied().unwrap_or(0);
            let derived_value = derived.get(&key).copied().unwrap_or(0);
            if cached_value != derived_value {
                mismatches.push(BalanceMismatch {
                    key,
                    cached: cached_value,
                    derived: derived_value,
                });
            }
        }
        Ok(mismatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use stockbook_catalog::{NewProduct, NewWarehouse, WarehouseKind};

    fn catalog_with(
        sku: &str,
    ) -> (Arc<CatalogRegistry>, WarehouseId, ProductId) {
        let catalog = Arc::new(CatalogRegistry::new());
        let warehouse = catalog
            .create_warehouse(NewWarehouse {
                name: "Main".to_string(),
                kind: WarehouseKind::Storage,
                location: "Dock 4".to_string(),
            })
            .unwrap();
        let product = catalog
            .create_product(NewProduct {
                sku: sku.to_string(),
                name: "Bolt M6".to_string(),
                unit: "pcs".to_string(),
                category: None,
                min_stock: 0,
            })
            .unwrap();
        (catalog, warehouse.id, product.id)
    }

    fn ledger() -> (MovementLedger, WarehouseId, ProductId) {
        let (catalog, warehouse, product) = catalog_with("BLT-6");
        let ledger = MovementLedger::new(
            InMemoryMovementStore::new(),
            catalog,
            LedgerConfig::default(),
        );
        (ledger, warehouse, product)
    }

    fn receipt(warehouse: WarehouseId, product: ProductId, delta: i64) -> RecordMovement {
        RecordMovement {
            warehouse,
            product,
            delta,
            kind: MovementKind::Receipt,
            actor: ActorId::new(),
            correlation: None,
        }
    }

    fn issue(warehouse: WarehouseId, product: ProductId, delta: i64) -> RecordMovement {
        RecordMovement {
            warehouse,
            product,
            delta,
            kind: MovementKind::Issue,
            actor: ActorId::new(),
            correlation: None,
        }
    }

    #[test]
    fn record_updates_balance_and_reports_both_sides() {
        let (ledger, warehouse, product) = ledger();

        let recorded = ledger.record(receipt(warehouse, product, 10)).unwrap();
        assert_eq!(recorded.previous, 0);
        assert_eq!(recorded.current, 10);

        let recorded = ledger.record(issue(warehouse, product, -4)).unwrap();
        assert_eq!(recorded.previous, 10);
        assert_eq!(recorded.current, 6);
        assert_eq!(ledger.balance(warehouse, product), 6);
    }

    #[test]
    fn zero_delta_is_rejected_before_storage() {
        let (ledger, warehouse, product) = ledger();
        let err = ledger
            .record(RecordMovement {
                delta: 0,
                ..receipt(warehouse, product, 1)
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(ledger.all_movements().unwrap().is_empty());
    }

    #[test]
    fn kind_and_sign_must_agree() {
        let (ledger, warehouse, product) = ledger();
        assert!(ledger.record(receipt(warehouse, product, -5)).is_err());
        assert!(ledger.record(issue(warehouse, product, 5)).is_err());
    }

    #[test]
    fn deleted_product_is_rejected() {
        let (ledger, warehouse, product) = ledger();
        ledger.catalog().delete_product(product).unwrap();

        let err = ledger.record(receipt(warehouse, product, 5)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn insufficient_stock_leaves_ledger_and_balance_unchanged() {
        let (ledger, warehouse, product) = ledger();
        ledger.record(receipt(warehouse, product, 3)).unwrap();

        let err = ledger.record(issue(warehouse, product, -5)).unwrap_err();
        match err {
            DomainError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        assert_eq!(ledger.balance(warehouse, product), 3);
        assert_eq!(ledger.all_movements().unwrap().len(), 1);
    }

    #[test]
    fn backorder_allow_permits_negative_balances() {
        let (catalog, warehouse, product) = catalog_with("BLT-6");
        let ledger = MovementLedger::new(
            InMemoryMovementStore::new(),
            catalog,
            LedgerConfig {
                backorder_policy: BackorderPolicy::Allow,
                ..LedgerConfig::default()
            },
        );

        let recorded = ledger.record(issue(warehouse, product, -5)).unwrap();
        assert_eq!(recorded.current, -5);
    }

    #[test]
    fn correction_may_drive_balance_down_without_cover() {
        let (ledger, warehouse, product) = ledger();
        ledger.record(receipt(warehouse, product, 2)).unwrap();

        // Counted quantity was lower than booked. A correction is exempt
        // from the cover check even when it lands the balance at zero or
        // below.
        let recorded = ledger
            .record(RecordMovement {
                warehouse,
                product,
                delta: -2,
                kind: MovementKind::Correction,
                actor: ActorId::new(),
                correlation: None,
            })
            .unwrap();
        assert_eq!(recorded.current, 0);
    }

    #[test]
    fn storage_failure_rolls_the_attempt_back() {
        struct FlakyStore {
            inner: InMemoryMovementStore,
            fail_next: AtomicBool,
        }

        impl MovementStore for FlakyStore {
            fn append_batch(&self, entries: Vec<StockMovement>) -> DomainResult<()> {
                if self.fail_next.swap(false, Ordering::SeqCst) {
                    return Err(DomainError::storage("simulated commit failure"));
                }
                self.inner.append_batch(entries)
            }

            fn for_key(&self, key: BalanceKey) -> DomainResult<Vec<StockMovement>> {
                self.inner.for_key(key)
            }

            fn all(&self) -> DomainResult<Vec<StockMovement>> {
                self.inner.all()
            }
        }

        let (catalog, warehouse, product) = catalog_with("BLT-6");
        let ledger = MovementLedger::new(
            FlakyStore {
                inner: InMemoryMovementStore::new(),
                fail_next: AtomicBool::new(true),
            },
            catalog,
            LedgerConfig::default(),
        );

        let err = ledger.record(receipt(warehouse, product, 10)).unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
        assert!(err.is_retryable());
        assert_eq!(ledger.balance(warehouse, product), 0);
        assert!(ledger.all_movements().unwrap().is_empty());

        // Retrying succeeds and finds no leftover state.
        let recorded = ledger.record(receipt(warehouse, product, 10)).unwrap();
        assert_eq!(recorded.previous, 0);
        assert_eq!(recorded.current, 10);
        assert!(ledger.verify_balances().unwrap().is_empty());
    }

    #[test]
    fn concurrent_writes_on_one_key_lose_no_update() {
        let (catalog, warehouse, product) = catalog_with("BLT-6");
        let ledger = Arc::new(MovementLedger::new(
            InMemoryMovementStore::new(),
            catalog,
            LedgerConfig {
                backorder_policy: BackorderPolicy::Allow,
                lock_timeout: std::time::Duration::from_secs(30),
            },
        ));

        let threads = 8;
        let per_thread = 50;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        let delta = if (t + i) % 2 == 0 { 3 } else { -2 };
                        let kind = if delta > 0 {
                            MovementKind::Receipt
                        } else {
                            MovementKind::Issue
                        };
                        ledger
                            .record(RecordMovement {
                                warehouse,
                                product,
                                delta,
                                kind,
                                actor: ActorId::new(),
                                correlation: None,
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let expected: i64 = ledger
            .all_movements()
            .unwrap()
            .iter()
            .map(|m| m.delta)
            .sum();
        assert_eq!(ledger.balance(warehouse, product), expected);
        assert!(ledger.verify_balances().unwrap().is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: for any sequence of inbound/outbound movements, the
        /// cached balance equals the sum of the applied deltas, and a full
        /// rebuild from the ledger alone reproduces the same value.
        #[test]
        fn balance_equals_sum_of_applied_deltas(
            deltas in prop::collection::vec(-50i64..50i64, 1..40)
        ) {
            let (catalog, warehouse, product) = catalog_with("BLT-6");
            let ledger = MovementLedger::new(
                InMemoryMovementStore::new(),
                catalog,
                LedgerConfig {
                    backorder_policy: BackorderPolicy::Allow,
                    ..LedgerConfig::default()
                },
            );

            let mut applied = 0i64;
            for delta in deltas {
                if delta == 0 {
                    continue;
                }
                let kind = if delta > 0 { MovementKind::Receipt } else { MovementKind::Issue };
                ledger.record(RecordMovement {
                    warehouse,
                    product,
                    delta,
                    kind,
                    actor: ActorId::new(),
                    correlation: None,
                }).unwrap();
                applied += delta;
            }

            prop_assert_eq!(ledger.balance(warehouse, product), applied);

            let rebuilt = ledger.rebuild_balances().unwrap();
            let key = BalanceKey::new(warehouse, product);
            prop_assert_eq!(rebuilt.get(&key).copied().unwrap_or(0), applied);
            prop_assert_eq!(ledger.balance(warehouse, product), applied);
        }
    }
}
