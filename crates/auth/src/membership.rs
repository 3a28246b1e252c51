use core::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bugtrail_core::{CompanyId, MemberId};

use crate::Role;

/// Identity of an authenticated principal (the session subject).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<PrincipalId> for Uuid {
    fn from(value: PrincipalId) -> Self {
        value.0
    }
}

impl FromStr for PrincipalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// A principal's membership in a company.
///
/// Membership is exclusive: a principal belongs to **at most one** company at
/// a time, which is why resolution takes no company argument — the company is
/// derived from the principal, never selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyMember {
    pub member_id: MemberId,
    pub principal_id: PrincipalId,
    pub company_id: CompanyId,
    pub role: Role,
}

/// Resolve an authenticated principal to its active company membership.
///
/// Read-only; implementations must not cache beyond a single request so role
/// changes take effect on the very next authorization decision. `None` means
/// the principal has no company join — callers must treat every
/// company-scoped action as denied ("join or register a company").
pub trait MembershipResolver: Send + Sync {
    fn membership_for(&self, principal: PrincipalId) -> Option<CompanyMember>;
}

impl<R> MembershipResolver for Arc<R>
where
    R: MembershipResolver + ?Sized,
{
    fn membership_for(&self, principal: PrincipalId) -> Option<CompanyMember> {
        (**self).membership_for(principal)
    }
}
