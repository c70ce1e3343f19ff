//! `stockbook-access` — the Access Policy Gate.
//!
//! Roles and a static (role × operation) permission table. Every mutating
//! operation is checked here before it reaches the ledger; denial surfaces
//! as `Unauthorized` without touching any other component.

pub mod actor;
pub mod operation;
pub mod policy;
pub mod role;

pub use actor::Actor;
pub use operation::Operation;
pub use policy::{allowed_operations, authorize, is_allowed};
pub use role::Role;
