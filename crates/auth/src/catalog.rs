//! The role/permission matrix.
//!
//! One data table maps each gated [`Action`] to the roles allowed to perform
//! it, instead of per-endpoint role checks scattered through handlers. The
//! lookup **fails closed**: an action without an entry is denied for every
//! role, and `validate_coverage` lets the API assert at startup that every
//! action it references actually has an entry.
//!
//! Role is necessary but not sufficient for resource-level operations; the
//! scope guard applies the second, ownership-conditioned gate.

use std::collections::HashMap;

use thiserror::Error;

use crate::{Action, Role};

/// Matrix shipped with the product.
///
/// Notes:
/// - Developer appears under `ticket.edit_status` only because an assigned
///   developer may move their own ticket; the scope guard restricts this to
///   the assignee.
/// - The comment actions admit every role; ownership ("own" actions) is
///   enforced by the scope guard, not by role.
const STANDARD_MATRIX: &[(Action, &[Role])] = &[
    (Action::CompanyEdit, &[Role::Admin]),
    (Action::CompanyDelete, &[Role::Admin]),
    (Action::CompanyInviteMember, &[Role::Admin]),
    (Action::CompanyRemoveMember, &[Role::Admin]),
    (Action::CompanyChangeMemberRole, &[Role::Admin]),
    (Action::ProjectCreate, &[Role::Admin, Role::ProjectManager]),
    (Action::ProjectEdit, &[Role::Admin, Role::ProjectManager]),
    (Action::ProjectDelete, &[Role::Admin]),
    (Action::ProjectArchive, &[Role::Admin, Role::ProjectManager]),
    (Action::ProjectAssignManager, &[Role::Admin]),
    (
        Action::ProjectAssignMembers,
        &[Role::Admin, Role::ProjectManager],
    ),
    (
        Action::ProjectViewMine,
        &[Role::Submitter, Role::Developer, Role::ProjectManager],
    ),
    (
        Action::TicketCreate,
        &[Role::Admin, Role::ProjectManager, Role::Submitter],
    ),
    (
        Action::TicketEditDetails,
        &[Role::Admin, Role::ProjectManager],
    ),
    (
        Action::TicketEditStatus,
        &[Role::Admin, Role::ProjectManager, Role::Developer],
    ),
    (Action::TicketEditType, &[Role::Admin, Role::ProjectManager]),
    (
        Action::TicketEditPriority,
        &[Role::Admin, Role::ProjectManager],
    ),
    (Action::TicketAssign, &[Role::Admin, Role::ProjectManager]),
    (Action::TicketArchive, &[Role::Admin, Role::ProjectManager]),
    (Action::TicketDelete, &[Role::Admin, Role::ProjectManager]),
    (Action::CommentCreate, &Role::ALL),
    (Action::CommentEditOwn, &Role::ALL),
    (Action::CommentDeleteOwn, &Role::ALL),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("role catalog has no entry for referenced action(s): {0:?}")]
    MissingActions(Vec<Action>),
}

/// Permission matrix: `Action` → set of allowed roles.
///
/// Pure lookup table, no side effects.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    entries: HashMap<Action, Vec<Role>>,
}

impl RoleCatalog {
    /// The catalog shipped with the product.
    pub fn standard() -> Self {
        Self::from_entries(
            STANDARD_MATRIX
                .iter()
                .map(|(action, roles)| (*action, roles.to_vec())),
        )
    }

    /// Build a catalog from explicit entries (tests, future policy sources).
    pub fn from_entries(entries: impl IntoIterator<Item = (Action, Vec<Role>)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Roles allowed to perform `action`, or `None` when the catalog has no
    /// entry for it.
    pub fn roles_for(&self, action: Action) -> Option<&[Role]> {
        self.entries.get(&action).map(|roles| roles.as_slice())
    }

    /// Whether `role` may perform `action`.
    ///
    /// Fails closed: a missing entry denies every role. There is no
    /// allow-by-default path through this table.
    pub fn permits(&self, action: Action, role: Role) -> bool {
        match self.entries.get(&action) {
            Some(roles) => roles.contains(&role),
            None => false,
        }
    }

    /// Assert that every action in `referenced` has a catalog entry.
    ///
    /// The API calls this at startup with the full action set it gates, so a
    /// newly added endpoint without a matrix row fails fast instead of being
    /// silently denied in production.
    pub fn validate_coverage(&self, referenced: &[Action]) -> Result<(), CatalogError> {
        let missing: Vec<Action> = referenced
            .iter()
            .copied()
            .filter(|action| !self.entries.contains_key(action))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::MissingActions(missing))
        }
    }
}
