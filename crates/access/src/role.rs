use core::str::FromStr;

use serde::{Deserialize, Serialize};

use stockbook_core::DomainError;

/// Role of an actor. Assigned by the external auth layer; the core never
/// derives or mutates it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    WarehouseManager,
    Clerk,
    Logistician,
    Analyst,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::WarehouseManager,
        Role::Clerk,
        Role::Logistician,
        Role::Analyst,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::WarehouseManager => "warehouse_manager",
            Role::Clerk => "clerk",
            Role::Logistician => "logistician",
            Role::Analyst => "analyst",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "warehouse_manager" => Ok(Role::WarehouseManager),
            "clerk" => Ok(Role::Clerk),
            "logistician" => Ok(Role::Logistician),
            "analyst" => Ok(Role::Analyst),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
