use serde::{Deserialize, Serialize};

/// Gated operations. Every mutating entry point maps to exactly one variant;
/// the gate is consulted before any other component runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    WarehouseCreate,
    WarehouseEdit,
    WarehouseDelete,
    ProductCreate,
    ProductEdit,
    ProductDelete,
    MovementRecord,
    TransferInitiate,
    InventoryCheckOpen,
    InventoryCheckClose,
    DiscrepancyResolve,
    UserRoleAssign,
    BalanceRead,
    ReportView,
}

impl Operation {
    pub const ALL: [Operation; 14] = [
        Operation::WarehouseCreate,
        Operation::WarehouseEdit,
        Operation::WarehouseDelete,
        Operation::ProductCreate,
        Operation::ProductEdit,
        Operation::ProductDelete,
        Operation::MovementRecord,
        Operation::TransferInitiate,
        Operation::InventoryCheckOpen,
        Operation::InventoryCheckClose,
        Operation::DiscrepancyResolve,
        Operation::UserRoleAssign,
        Operation::BalanceRead,
        Operation::ReportView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::WarehouseCreate => "warehouse-create",
            Operation::WarehouseEdit => "warehouse-edit",
            Operation::WarehouseDelete => "warehouse-delete",
            Operation::ProductCreate => "product-create",
            Operation::ProductEdit => "product-edit",
            Operation::ProductDelete => "product-delete",
            Operation::MovementRecord => "movement-record",
            Operation::TransferInitiate => "transfer-initiate",
            Operation::InventoryCheckOpen => "inventory-check-open",
            Operation::InventoryCheckClose => "inventory-check-close",
            Operation::DiscrepancyResolve => "discrepancy-resolve",
            Operation::UserRoleAssign => "user-role-assign",
            Operation::BalanceRead => "balance-read",
            Operation::ReportView => "report-view",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
