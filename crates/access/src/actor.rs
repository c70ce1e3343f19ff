use serde::{Deserialize, Serialize};

use stockbook_core::ActorId;

use crate::Role;

/// A fully resolved actor for authorization decisions.
///
/// Construction is decoupled from storage and transport: the excluded auth
/// layer resolves identity and role and hands the pair in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: ActorId, role: Role) -> Self {
        Self { id, role }
    }
}
