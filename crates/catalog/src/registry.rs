use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::info;

use stockbook_core::{DomainError, DomainResult, ProductId, WarehouseId};

use crate::product::{NewProduct, Product, ProductUpdate, Sku};
use crate::warehouse::{NewWarehouse, Warehouse, WarehouseUpdate};

#[derive(Debug, Default)]
struct ProductTable {
    items: HashMap<ProductId, Product>,
    by_sku: HashMap<Sku, ProductId>,
}

/// In-memory registry of products and warehouses.
///
/// Records are logically deleted only: ledger history keeps referencing them,
/// so identities are never reused or removed.
#[derive(Debug, Default)]
pub struct CatalogRegistry {
    products: RwLock<ProductTable>,
    warehouses: RwLock<HashMap<WarehouseId, Warehouse>>,
}

impl CatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── warehouses ──────────────────────────────────────────────────────

    pub fn create_warehouse(&self, new: NewWarehouse) -> DomainResult<Warehouse> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("warehouse name cannot be empty"));
        }

        let now = Utc::now();
        let warehouse = Warehouse {
            id: WarehouseId::new(),
            name: new.name,
            kind: new.kind,
            location: new.location,
            deleted: false,
            created_at: now,
            updated_at: now,
        };

        let mut map = self
            .warehouses
            .write()
            .map_err(|_| DomainError::storage("warehouse registry lock poisoned"))?;
        map.insert(warehouse.id, warehouse.clone());

        info!(warehouse = %warehouse.id, name = %warehouse.name, "warehouse created");
        Ok(warehouse)
    }

    pub fn update_warehouse(
        &self,
        id: WarehouseId,
        update: WarehouseUpdate,
    ) -> DomainResult<Warehouse> {
        let mut map = self
            .warehouses
            .write()
            .map_err(|_| DomainError::storage("warehouse registry lock poisoned"))?;
        let warehouse = map
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("warehouse {id}")))?;
        if warehouse.deleted {
            return Err(DomainError::conflict(format!("warehouse {id} is deleted")));
        }

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("warehouse name cannot be empty"));
            }
            warehouse.name = name;
        }
        if let Some(kind) = update.kind {
            warehouse.kind = kind;
        }
        if let Some(location) = update.location {
            warehouse.location = location;
        }
        warehouse.updated_at = Utc::now();

        Ok(warehouse.clone())
    }

    /// Logical deletion. Idempotent; the record stays for ledger history.
    pub fn delete_warehouse(&self, id: WarehouseId) -> DomainResult<()> {
        let mut map = self
            .warehouses
            .write()
            .map_err(|_| DomainError::storage("warehouse registry lock poisoned"))?;
        let warehouse = map
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("warehouse {id}")))?;
        warehouse.deleted = true;
        warehouse.updated_at = Utc::now();

        info!(warehouse = %id, "warehouse deleted (logical)");
        Ok(())
    }

    pub fn warehouse(&self, id: WarehouseId) -> DomainResult<Warehouse> {
        let map = self
            .warehouses
            .read()
            .map_err(|_| DomainError::storage("warehouse registry lock poisoned"))?;
        map.get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("warehouse {id}")))
    }

    pub fn warehouses(&self) -> Vec<Warehouse> {
        self.warehouses
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Reference check used by the ledger before any write.
    pub fn ensure_active_warehouse(&self, id: WarehouseId) -> DomainResult<()> {
        let warehouse = self
            .warehouse(id)
            .map_err(|_| DomainError::validation(format!("unknown warehouse {id}")))?;
        if !warehouse.is_active() {
            return Err(DomainError::validation(format!(
                "warehouse {id} is deleted"
            )));
        }
        Ok(())
    }

    // ── products ────────────────────────────────────────────────────────

    pub fn create_product(&self, new: NewProduct) -> DomainResult<Product> {
        let sku = Sku::new(new.sku)?;
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if new.unit.trim().is_empty() {
            return Err(DomainError::validation("product unit cannot be empty"));
        }

        let mut table = self
            .products
            .write()
            .map_err(|_| DomainError::storage("product registry lock poisoned"))?;
        if table.by_sku.contains_key(&sku) {
            return Err(DomainError::conflict(format!("SKU '{sku}' already exists")));
        }

        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            sku: sku.clone(),
            name: new.name,
            unit: new.unit,
            category: new.category,
            min_stock: new.min_stock,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        table.by_sku.insert(sku, product.id);
        table.items.insert(product.id, product.clone());

        info!(product = %product.id, sku = %product.sku, "product created");
        Ok(product)
    }

    pub fn update_product(&self, id: ProductId, update: ProductUpdate) -> DomainResult<Product> {
        let mut table = self
            .products
            .write()
            .map_err(|_| DomainError::storage("product registry lock poisoned"))?;
        let product = table
            .items
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        if product.deleted {
            return Err(DomainError::conflict(format!("product {id} is deleted")));
        }

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("product name cannot be empty"));
            }
            product.name = name;
        }
        if let Some(unit) = update.unit {
            if unit.trim().is_empty() {
                return Err(DomainError::validation("product unit cannot be empty"));
            }
            product.unit = unit;
        }
        if let Some(category) = update.category {
            product.category = category;
        }
        product.updated_at = Utc::now();

        Ok(product.clone())
    }

    /// Set the low-stock threshold. Zero disarms the monitor for the product.
    pub fn set_min_stock(&self, id: ProductId, min_stock: u64) -> DomainResult<Product> {
        let mut table = self
            .products
            .write()
            .map_err(|_| DomainError::storage("product registry lock poisoned"))?;
        let product = table
            .items
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        if product.deleted {
            return Err(DomainError::conflict(format!("product {id} is deleted")));
        }
        product.min_stock = min_stock;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    /// Logical deletion. Idempotent; the SKU stays reserved.
    pub fn delete_product(&self, id: ProductId) -> DomainResult<()> {
        let mut table = self
            .products
            .write()
            .map_err(|_| DomainError::storage("product registry lock poisoned"))?;
        let product = table
            .items
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
        product.deleted = true;
        product.updated_at = Utc::now();

        info!(product = %id, "product deleted (logical)");
        Ok(())
    }

    pub fn product(&self, id: ProductId) -> DomainResult<Product> {
        let table = self
            .products
            .read()
            .map_err(|_| DomainError::storage("product registry lock poisoned"))?;
        table
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    pub fn products(&self) -> Vec<Product> {
        self.products
            .read()
            .map(|table| table.items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Reference check used by the ledger before any write.
    pub fn ensure_active_product(&self, id: ProductId) -> DomainResult<()> {
        let product = self
            .product(id)
            .map_err(|_| DomainError::validation(format!("unknown product {id}")))?;
        if !product.is_active() {
            return Err(DomainError::validation(format!("product {id} is deleted")));
        }
        Ok(())
    }
}
