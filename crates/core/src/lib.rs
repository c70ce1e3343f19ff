//! `stockbook-core` — foundation building blocks for the inventory ledger.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{
    ActorId, CheckId, CorrelationId, DiscrepancyId, MovementId, NotificationId, ProductId,
    WarehouseId,
};
