//! Archival lifecycle guard shared by projects and tickets.
//!
//! Archivable resources have two states, `Active` and `Archived`, with the
//! reversible transitions `archive` and `unarchive`. While archived, only a
//! fixed allow-list of mutations may run: the archive toggle itself (so the
//! state stays reversible) and name/description-only edits. Reads are never
//! gated here.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Archival state of a project or ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveState {
    #[default]
    Active,
    Archived,
}

impl ArchiveState {
    pub fn from_flag(archived: bool) -> Self {
        if archived {
            ArchiveState::Archived
        } else {
            ArchiveState::Active
        }
    }

    pub fn is_archived(self) -> bool {
        matches!(self, ArchiveState::Archived)
    }
}

impl core::fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ArchiveState::Active => f.write_str("active"),
            ArchiveState::Archived => f.write_str("archived"),
        }
    }
}

/// Classification of a mutating operation for lifecycle gating.
///
/// Classification is explicit per endpoint: an update that touches any field
/// beyond name/description must be classified `General` as a whole, so a
/// mixed update against an archived resource is rejected wholesale rather
/// than partially applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// `archive` / `unarchive`.
    ArchiveToggle,
    /// Name/description-only edit.
    DetailsEdit,
    /// Any other mutation (status, priority, type, assignment, comments, ...).
    General,
}

/// Decide whether a mutation of `kind` may run while in `state`.
pub fn check_mutation(state: ArchiveState, kind: MutationKind) -> DomainResult<()> {
    match (state, kind) {
        (ArchiveState::Active, _) => Ok(()),
        (ArchiveState::Archived, MutationKind::ArchiveToggle | MutationKind::DetailsEdit) => Ok(()),
        (ArchiveState::Archived, MutationKind::General) => Err(DomainError::invalid_state(
            "only archive/unarchive and name/description edits are permitted",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_permits_everything() {
        for kind in [
            MutationKind::ArchiveToggle,
            MutationKind::DetailsEdit,
            MutationKind::General,
        ] {
            assert!(check_mutation(ArchiveState::Active, kind).is_ok());
        }
    }

    #[test]
    fn archived_permits_only_allow_list() {
        assert!(check_mutation(ArchiveState::Archived, MutationKind::ArchiveToggle).is_ok());
        assert!(check_mutation(ArchiveState::Archived, MutationKind::DetailsEdit).is_ok());

        let err = check_mutation(ArchiveState::Archived, MutationKind::General).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn state_from_flag_roundtrip() {
        assert!(ArchiveState::from_flag(true).is_archived());
        assert!(!ArchiveState::from_flag(false).is_archived());
    }
}
