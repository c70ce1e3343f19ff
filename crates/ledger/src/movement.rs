use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{ActorId, CorrelationId, MovementId, ProductId, WarehouseId};

use crate::balance::BalanceKey;

/// Operation kind of a ledger entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Receipt,
    Issue,
    TransferLeg,
    Correction,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Receipt => "receipt",
            MovementKind::Issue => "issue",
            MovementKind::TransferLeg => "transfer_leg",
            MovementKind::Correction => "correction",
        }
    }

    /// Outbound kinds that must be covered by the current balance under a
    /// no-backorder policy. Corrections are exempt: they assert a physically
    /// counted, non-negative quantity.
    pub fn requires_cover(&self) -> bool {
        matches!(self, MovementKind::Issue | MovementKind::TransferLeg)
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable ledger entry: a signed quantity change for a product at a
/// warehouse. Once appended it is never edited or deleted; reversal happens
/// through a new compensating entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    /// Time-ordered id; sorting by id reproduces append order.
    pub id: MovementId,
    pub warehouse: WarehouseId,
    pub product: ProductId,
    /// Positive = inbound, negative = outbound. Never zero.
    pub delta: i64,
    pub kind: MovementKind,
    pub actor: ActorId,
    /// Links paired entries: both legs of a transfer, or a correction to the
    /// discrepancy it compensates.
    pub correlation: Option<CorrelationId>,
    pub recorded_at: DateTime<Utc>,
}

impl StockMovement {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        warehouse: WarehouseId,
        product: ProductId,
        delta: i64,
        kind: MovementKind,
        actor: ActorId,
        correlation: Option<CorrelationId>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MovementId::new(),
            warehouse,
            product,
            delta,
            kind,
            actor,
            correlation,
            recorded_at,
        }
    }

    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.warehouse, self.product)
    }
}
