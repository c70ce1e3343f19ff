//! Operation audit trail.
//!
//! One append-only record per successful mutating operation. Purely
//! observational: nothing in the core reads it back for decisions.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_access::Operation;
use stockbook_core::ActorId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor: ActorId,
    pub operation: Operation,
    /// Short description of the entity touched, e.g. "movement 0192…".
    pub entity: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct AuditTrail {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Best-effort append; a poisoned lock loses the entry, never the
    /// operation that produced it.
    pub fn record(&self, actor: ActorId, operation: Operation, entity: impl Into<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.push(AuditEntry {
                actor,
                operation,
                entity: entity.into(),
                recorded_at: Utc::now(),
            });
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}
