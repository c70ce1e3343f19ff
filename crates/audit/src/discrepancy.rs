use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{CheckId, DiscrepancyId, ProductId, WarehouseId};

/// How a discrepancy gets settled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Issue a compensating correction so the ledger matches the count.
    Corrected,
    /// Keep the ledger as-is; the mismatch is acknowledged and recorded.
    AcceptedAsIs,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyStatus {
    Open,
    Corrected,
    AcceptedAsIs,
}

/// A count-vs-ledger mismatch found when a check closed. Resolved exactly
/// once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub id: DiscrepancyId,
    pub check: CheckId,
    pub warehouse: WarehouseId,
    pub product: ProductId,
    /// Physically counted quantity.
    pub counted: u64,
    /// Ledger balance at close time.
    pub expected: i64,
    /// `counted - expected`; the delta a correction entry would carry.
    pub delta: i64,
    pub status: DiscrepancyStatus,
    pub found_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Discrepancy {
    pub(crate) fn new(
        check: CheckId,
        warehouse: WarehouseId,
        product: ProductId,
        counted: u64,
        expected: i64,
    ) -> Self {
        Self {
            id: DiscrepancyId::new(),
            check,
            warehouse,
            product,
            counted,
            expected,
            delta: counted as i64 - expected,
            status: DiscrepancyStatus::Open,
            found_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == DiscrepancyStatus::Open
    }
}
