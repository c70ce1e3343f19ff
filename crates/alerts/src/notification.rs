use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_catalog::Product;
use stockbook_core::{CheckId, DiscrepancyId, NotificationId, ProductId, WarehouseId};

/// What happened. Delivery channels are the external dispatcher's concern.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    LowStock,
    DiscrepancyFound,
}

/// An emitted event referencing the entity that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub warehouse: WarehouseId,
    pub product: ProductId,
    /// Check the discrepancy belongs to; `None` for low-stock alerts.
    pub check: Option<CheckId>,
    /// Set for discrepancy notifications.
    pub discrepancy: Option<DiscrepancyId>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl Notification {
    pub fn low_stock(warehouse: WarehouseId, product: &Product, balance: i64) -> Self {
        Self {
            id: NotificationId::new(),
            kind: NotificationKind::LowStock,
            warehouse,
            product: product.id,
            check: None,
            discrepancy: None,
            message: format!(
                "low stock for {} ({}): balance {} is below threshold {}",
                product.name, product.sku, balance, product.min_stock
            ),
            occurred_at: Utc::now(),
        }
    }

    pub fn discrepancy_found(
        warehouse: WarehouseId,
        product: ProductId,
        check: CheckId,
        discrepancy: DiscrepancyId,
        delta: i64,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            kind: NotificationKind::DiscrepancyFound,
            warehouse,
            product,
            check: Some(check),
            discrepancy: Some(discrepancy),
            message: format!("inventory check found a discrepancy of {delta}"),
            occurred_at: Utc::now(),
        }
    }
}
