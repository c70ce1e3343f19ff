use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::WarehouseId;

/// Kind of warehouse, which drives reporting but no core invariant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseKind {
    Storage,
    Retail,
    Distribution,
}

/// Catalog record for a warehouse. Identity immutable; metadata mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub kind: WarehouseKind,
    pub location: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Warehouse {
    pub fn is_active(&self) -> bool {
        !self.deleted
    }
}

/// Input for [`crate::CatalogRegistry::create_warehouse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWarehouse {
    pub name: String,
    pub kind: WarehouseKind,
    pub location: String,
}

/// Partial update for mutable warehouse metadata. `None` fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseUpdate {
    pub name: Option<String>,
    pub kind: Option<WarehouseKind>,
    pub location: Option<String>,
}
