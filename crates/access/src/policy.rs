//! Static permission table, evaluated once per call.

use stockbook_core::{DomainError, DomainResult};

use crate::{Actor, Operation, Role};

/// The (role × operation) permission table.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn is_allowed(role: Role, operation: Operation) -> bool {
    use Operation::*;

    match role {
        Role::Admin => true,
        Role::WarehouseManager => !matches!(operation, WarehouseDelete | UserRoleAssign),
        Role::Clerk => matches!(
            operation,
            ProductCreate
                | ProductEdit
                | MovementRecord
                | InventoryCheckOpen
                | InventoryCheckClose
                | BalanceRead
        ),
        Role::Logistician => matches!(operation, MovementRecord | TransferInitiate | BalanceRead),
        Role::Analyst => matches!(operation, BalanceRead | ReportView),
    }
}

/// Authorize an actor for one operation.
///
/// Deny results propagate as [`DomainError::Unauthorized`] to the caller
/// before any mutation is attempted.
pub fn authorize(actor: &Actor, operation: Operation) -> DomainResult<()> {
    if is_allowed(actor.role, operation) {
        Ok(())
    } else {
        Err(DomainError::Unauthorized {
            role: actor.role.as_str().to_string(),
            operation: operation.as_str().to_string(),
        })
    }
}

/// Everything a role may do. Intended for UI hinting, not for enforcement.
pub fn allowed_operations(role: Role) -> Vec<Operation> {
    Operation::ALL
        .into_iter()
        .filter(|op| is_allowed(role, *op))
        .collect()
}
