//! Domain error model.

use thiserror::Error;

use crate::id::{DiscrepancyId, ProductId, WarehouseId};

/// Result type used across the ledger core.
pub type DomainResult<T> = Result<T, DomainError>;

/// Failure taxonomy for every core operation.
///
/// All failures are returned as typed results to the immediate caller; nothing
/// is retried inside the core. A failed operation never leaves partial state
/// behind and never corrupts or locks out unrelated keys.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad input (zero delta, bad identity reference, malformed SKU, ...).
    /// Rejected before any storage interaction.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The balance for (warehouse, product) would go below zero under a
    /// no-backorder policy. Nothing was written.
    #[error(
        "insufficient stock for product {product} at warehouse {warehouse}: \
         available {available}, requested {requested}"
    )]
    InsufficientStock {
        warehouse: WarehouseId,
        product: ProductId,
        available: i64,
        requested: i64,
    },

    /// Access Policy Gate denial. Surfaced before any other component runs.
    #[error("unauthorized: role '{role}' may not perform '{operation}'")]
    Unauthorized { role: String, operation: String },

    /// State conflict (open check already exists, closed check mutated, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The discrepancy was resolved before; resolution is terminal.
    #[error("discrepancy {0} is already resolved")]
    AlreadyResolved(DiscrepancyId),

    /// A key lock could not be acquired within the configured budget.
    /// Safe to retry: no writes were performed.
    #[error("busy: {0}")]
    Busy(String),

    /// The underlying store failed. The attempt was rolled back in full;
    /// safe to retry.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether a caller may resubmit the same operation as-is.
    ///
    /// True only for failures that are guaranteed to have written nothing
    /// and that a later attempt may not hit again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy(_) | Self::Storage(_))
    }
}
