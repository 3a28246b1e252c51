//! Ownership scope guard.
//!
//! Decides whether a member may touch a specific project/ticket/comment by
//! walking the ownership chain (ticket → project → company) against the
//! caller's membership. Decisions are **tagged results**, not errors, so the
//! pipeline composes them explicitly and callers cannot accidentally treat a
//! Forbid as an Allow.
//!
//! Precedence rule: an unresolvable chain is always `NotFound`, regardless of
//! role — a nonexistent resource must never surface as `Forbid`, and a
//! same-company role failure must never surface as `NotFound`.

use bugtrail_core::{CompanyId, DomainError, DomainResult, MemberId};

use crate::{CompanyMember, Role};

/// Outcome of a scope check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeVerdict {
    Allow,
    Forbid,
    NotFound,
}

impl ScopeVerdict {
    /// Map into the shared error taxonomy for pipeline composition.
    pub fn into_result(self) -> DomainResult<()> {
        match self {
            ScopeVerdict::Allow => Ok(()),
            ScopeVerdict::Forbid => Err(DomainError::Forbidden),
            ScopeVerdict::NotFound => Err(DomainError::NotFound),
        }
    }
}

/// Ownership snapshot of a project, as needed for scope decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectScope {
    pub company_id: CompanyId,
    /// The member assigned as this project's manager, if any.
    pub manager_id: Option<MemberId>,
}

/// Ownership snapshot of a ticket, as needed for scope decisions.
///
/// `project` is `None` when the ticket references a project that no longer
/// resolves (orphaned chain) — that is reported as `NotFound`, not `Forbid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketScope {
    pub project: Option<ProjectScope>,
    pub submitter_id: MemberId,
    pub assignee_id: Option<MemberId>,
}

/// Scope check for a project resource.
///
/// `None` means the project does not exist. Company co-membership is the only
/// gate at project level; the role catalog covers the rest.
pub fn project_scope(member: &CompanyMember, project: Option<&ProjectScope>) -> ScopeVerdict {
    let Some(project) = project else {
        return ScopeVerdict::NotFound;
    };

    if project.company_id != member.company_id {
        return ScopeVerdict::Forbid;
    }

    ScopeVerdict::Allow
}

/// Scope check for a ticket resource (two-tier).
///
/// Tier one: the ticket's ownership chain must resolve to the member's
/// company. Tier two, role-conditioned:
/// - Admin: always allowed within the company.
/// - ProjectManager: only on projects they manage — same-company is not enough.
/// - Developer/Submitter: only as the ticket's assignee or submitter.
pub fn ticket_scope(member: &CompanyMember, ticket: Option<&TicketScope>) -> ScopeVerdict {
    let Some(ticket) = ticket else {
        return ScopeVerdict::NotFound;
    };
    let Some(project) = ticket.project.as_ref() else {
        // Orphaned reference: the chain does not resolve.
        return ScopeVerdict::NotFound;
    };

    if project.company_id != member.company_id {
        return ScopeVerdict::Forbid;
    }

    match member.role {
        Role::Admin => ScopeVerdict::Allow,
        Role::ProjectManager => {
            if project.manager_id == Some(member.member_id) {
                ScopeVerdict::Allow
            } else {
                ScopeVerdict::Forbid
            }
        }
        Role::Developer | Role::Submitter => {
            if ticket.assignee_id == Some(member.member_id)
                || ticket.submitter_id == member.member_id
            {
                ScopeVerdict::Allow
            } else {
                ScopeVerdict::Forbid
            }
        }
    }
}

/// Ownership check for "own"-scoped comment actions.
///
/// `None` means the comment does not exist. Ownership binds **every** role:
/// an Admin deleting another member's comment is forbidden despite their
/// otherwise broad privileges.
pub fn own_comment(member: &CompanyMember, sender_id: Option<MemberId>) -> ScopeVerdict {
    let Some(sender_id) = sender_id else {
        return ScopeVerdict::NotFound;
    };

    if sender_id == member.member_id {
        ScopeVerdict::Allow
    } else {
        ScopeVerdict::Forbid
    }
}
