use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bugtrail_core::DomainError;

/// Role of a company member.
///
/// The role set is closed reference data: the catalog, the scope guard and
/// the API all match exhaustively on it, so adding a role is a deliberate
/// code change, never a data migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    ProjectManager,
    Developer,
    Submitter,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Admin,
        Role::ProjectManager,
        Role::Developer,
        Role::Submitter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::ProjectManager => "project_manager",
            Role::Developer => "developer",
            Role::Submitter => "submitter",
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
            "project_manager" => Ok(Role::ProjectManager),
            "developer" => Ok(Role::Developer),
            "submitter" => Ok(Role::Submitter),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}
