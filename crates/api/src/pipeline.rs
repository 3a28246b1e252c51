//! Fixed-order authorization pipeline.
//!
//! Stage order is part of the contract:
//!
//! ```text
//! 1. authentication      (middleware; Unauthenticated)
//! 2. membership          (NoMembership)
//! 3. role catalog        (Forbidden, fail-closed)
//! 4. ownership scope     (Forbidden / NotFound)
//! 5. archival lifecycle  (InvalidState)
//! 6. execute
//! ```
//!
//! A failed stage short-circuits everything after it. Handlers call
//! [`RequestPipeline::authorize`] for stages 2-3 and compose stages 4-5 from
//! the scope/lifecycle helpers before dispatching.

use bugtrail_auth::{Action, CompanyMember, MembershipResolver, PrincipalId, RoleCatalog};
use bugtrail_core::{check_mutation, ArchiveState, DomainError, DomainResult, MutationKind};

pub struct RequestPipeline<R> {
    catalog: RoleCatalog,
    resolver: R,
}

impl<R> RequestPipeline<R>
where
    R: MembershipResolver,
{
    pub fn new(catalog: RoleCatalog, resolver: R) -> Self {
        Self { catalog, resolver }
    }

    /// Stage 2: resolve the caller's seat. Principals without a seat get
    /// `NoMembership`, never `Forbidden`.
    pub fn member(&self, principal: PrincipalId) -> DomainResult<CompanyMember> {
        self.resolver
            .membership_for(principal)
            .ok_or(DomainError::NoMembership)
    }

    /// Stages 2 + 3: membership, then the role catalog.
    ///
    /// The catalog fails closed, so an action with no entry denies every
    /// role. Scope and lifecycle are not consulted here; a role failure
    /// short-circuits them.
    pub fn authorize(&self, principal: PrincipalId, action: Action) -> DomainResult<CompanyMember> {
        let member = self.member(principal)?;
        if !self.catalog.permits(action, member.role) {
            return Err(DomainError::Forbidden);
        }
        Ok(member)
    }

    /// Whether the principal currently holds a seat anywhere. Membership is
    /// exclusive, so this gates company registration and invitations.
    pub fn is_seated(&self, principal: PrincipalId) -> bool {
        self.resolver.membership_for(principal).is_some()
    }
}

/// Stage 5 for checks the aggregate cannot make itself, e.g. opening a
/// ticket under an archived project.
pub fn ensure_live(archived: bool, kind: MutationKind) -> DomainResult<()> {
    let state = if archived {
        ArchiveState::Archived
    } else {
        ArchiveState::Active
    };
    check_mutation(state, kind)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use bugtrail_auth::{Role, RoleCatalog};
    use bugtrail_core::{CompanyId, MemberId};

    use super::*;

    struct FixedResolver {
        seats: HashMap<PrincipalId, CompanyMember>,
    }

    impl MembershipResolver for FixedResolver {
        fn membership_for(&self, principal: PrincipalId) -> Option<CompanyMember> {
            self.seats.get(&principal).copied()
        }
    }

    fn pipeline_with(
        seats: Vec<CompanyMember>,
    ) -> RequestPipeline<FixedResolver> {
        RequestPipeline::new(
            RoleCatalog::standard(),
            FixedResolver {
                seats: seats.into_iter().map(|m| (m.principal_id, m)).collect(),
            },
        )
    }

    fn seat(role: Role) -> CompanyMember {
        CompanyMember {
            member_id: MemberId::new(),
            principal_id: PrincipalId::new(),
            company_id: CompanyId::new(),
            role,
        }
    }

    #[test]
    fn unseated_principal_is_no_membership_not_forbidden() {
        let pipeline = pipeline_with(vec![]);
        let err = pipeline
            .authorize(PrincipalId::new(), Action::ProjectCreate)
            .unwrap_err();
        assert_eq!(err, DomainError::NoMembership);
    }

    #[test]
    fn role_gate_runs_after_membership() {
        let submitter = seat(Role::Submitter);
        let pipeline = pipeline_with(vec![submitter]);

        assert_eq!(
            pipeline
                .authorize(submitter.principal_id, Action::ProjectCreate)
                .unwrap_err(),
            DomainError::Forbidden
        );
        assert!(pipeline
            .authorize(submitter.principal_id, Action::TicketCreate)
            .is_ok());
    }

    #[test]
    fn unknown_action_fails_closed() {
        let admin = seat(Role::Admin);
        let pipeline = RequestPipeline::new(
            RoleCatalog::from_entries(Vec::<(Action, Vec<Role>)>::new()),
            FixedResolver {
                seats: [(admin.principal_id, admin)].into_iter().collect(),
            },
        );

        assert_eq!(
            pipeline
                .authorize(admin.principal_id, Action::CompanyEdit)
                .unwrap_err(),
            DomainError::Forbidden
        );
    }

    #[test]
    fn lifecycle_helper_blocks_general_mutations_only() {
        assert!(ensure_live(false, MutationKind::General).is_ok());
        assert!(ensure_live(true, MutationKind::ArchiveToggle).is_ok());
        assert!(ensure_live(true, MutationKind::DetailsEdit).is_ok());
        assert!(matches!(
            ensure_live(true, MutationKind::General),
            Err(DomainError::InvalidState(_))
        ));
    }
}
