//! `stockbook-catalog` — product and warehouse registry.
//!
//! Master data the ledger validates references against: products (with SKU
//! and low-stock threshold) and warehouses. Records are logically deleted
//! only, preserving ledger history.

pub mod product;
pub mod registry;
pub mod warehouse;

pub use product::{NewProduct, Product, ProductUpdate, Sku};
pub use registry::CatalogRegistry;
pub use warehouse::{NewWarehouse, Warehouse, WarehouseKind, WarehouseUpdate};
