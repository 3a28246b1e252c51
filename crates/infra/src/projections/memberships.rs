//! Memberships projection: company rosters plus the principal → membership
//! index behind [`MembershipResolver`].
//!
//! Membership is exclusive (one company per principal), so the index maps a
//! principal to at most one seat. Resolution reads the live index on every
//! call; nothing is cached per request, so a role change or removal takes
//! effect on the next authorization decision.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bugtrail_auth::{CompanyMember, MembershipResolver, PrincipalId, Role};
use bugtrail_company::{
    CompanyDeleted, CompanyDetailsUpdated, CompanyEvent, CompanyRegistered, MemberInvited,
    MemberRemoved, MemberRoleChanged,
};
use bugtrail_core::{CompanyId, MemberId};
use bugtrail_events::EventEnvelope;

use super::COMPANY_AGGREGATE_TYPE;
use crate::read_model::CompanyStore;

/// One roster seat, for listing a company's members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberReadModel {
    pub member_id: MemberId,
    pub principal_id: PrincipalId,
    pub company_id: CompanyId,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// Company name/description snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyDetails {
    pub company_id: CompanyId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Projection over the company stream.
pub struct MembershipsProjection<S> {
    roster: S,
    by_principal: RwLock<HashMap<PrincipalId, CompanyMember>>,
    companies: RwLock<HashMap<CompanyId, CompanyDetails>>,
}

impl<S> MembershipsProjection<S>
where
    S: CompanyStore<MemberId, MemberReadModel>,
{
    pub fn new(roster: S) -> Self {
        Self {
            roster,
            by_principal: RwLock::new(HashMap::new()),
            companies: RwLock::new(HashMap::new()),
        }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != COMPANY_AGGREGATE_TYPE {
            return Ok(());
        }

        let event: CompanyEvent = serde_json::from_value(envelope.payload().clone())?;
        match event {
            CompanyEvent::Registered(e) => self.apply_registered(e),
            CompanyEvent::DetailsUpdated(e) => self.apply_details_updated(e),
            CompanyEvent::MemberInvited(e) => self.apply_invited(e),
            CompanyEvent::MemberRemoved(e) => self.apply_removed(e),
            CompanyEvent::MemberRoleChanged(e) => self.apply_role_changed(e),
            CompanyEvent::Deleted(e) => self.apply_deleted(e),
        }
        Ok(())
    }

    fn apply_registered(&self, e: CompanyRegistered) {
        if let Ok(mut companies) = self.companies.write() {
            companies.insert(
                e.company_id,
                CompanyDetails {
                    company_id: e.company_id,
                    name: e.name,
                    description: e.description,
                    created_at: e.occurred_at,
                    updated_at: e.occurred_at,
                },
            );
        }
        self.seat(
            e.company_id,
            e.creator_member_id,
            e.creator_principal_id,
            Role::Admin,
            e.occurred_at,
        );
    }

    fn apply_details_updated(&self, e: CompanyDetailsUpdated) {
        if let Ok(mut companies) = self.companies.write() {
            if let Some(details) = companies.get_mut(&e.company_id) {
                if let Some(name) = e.name {
                    details.name = name;
                }
                if let Some(description) = e.description {
                    details.description = description;
                }
                details.updated_at = e.occurred_at;
            }
        }
    }

    fn apply_invited(&self, e: MemberInvited) {
        self.seat(e.company_id, e.member_id, e.principal_id, e.role, e.occurred_at);
    }

    fn apply_removed(&self, e: MemberRemoved) {
        self.roster.remove(e.company_id, &e.member_id);
        if let Ok(mut index) = self.by_principal.write() {
            index.remove(&e.principal_id);
        }
    }

    fn apply_role_changed(&self, e: MemberRoleChanged) {
        if let Some(mut seat) = self.roster.get(e.company_id, &e.member_id) {
            seat.role = e.new_role;
            let principal_id = seat.principal_id;
            self.roster.upsert(e.company_id, e.member_id, seat);
            if let Ok(mut index) = self.by_principal.write() {
                if let Some(m) = index.get_mut(&principal_id) {
                    m.role = e.new_role;
                }
            }
        }
    }

    fn apply_deleted(&self, e: CompanyDeleted) {
        if let Ok(mut index) = self.by_principal.write() {
            index.retain(|_, m| m.company_id != e.company_id);
        }
        if let Ok(mut companies) = self.companies.write() {
            companies.remove(&e.company_id);
        }
        self.roster.clear_company(e.company_id);
    }

    fn seat(
        &self,
        company_id: CompanyId,
        member_id: MemberId,
        principal_id: PrincipalId,
        role: Role,
        joined_at: DateTime<Utc>,
    ) {
        self.roster.upsert(
            company_id,
            member_id,
            MemberReadModel {
                member_id,
                principal_id,
                company_id,
                role,
                joined_at,
            },
        );
        if let Ok(mut index) = self.by_principal.write() {
            index.insert(
                principal_id,
                CompanyMember {
                    member_id,
                    principal_id,
                    company_id,
                    role,
                },
            );
        }
    }

    /// Company details snapshot, if the company exists.
    pub fn company(&self, company_id: CompanyId) -> Option<CompanyDetails> {
        self.companies.read().ok()?.get(&company_id).cloned()
    }

    /// List the company roster.
    pub fn members(&self, company_id: CompanyId) -> Vec<MemberReadModel> {
        self.roster.list(company_id)
    }

    /// Look up a seat by member id.
    pub fn member(&self, company_id: CompanyId, member_id: &MemberId) -> Option<MemberReadModel> {
        self.roster.get(company_id, member_id)
    }
}

impl<S> MembershipResolver for MembershipsProjection<S>
where
    S: CompanyStore<MemberId, MemberReadModel>,
{
    fn membership_for(&self, principal: PrincipalId) -> Option<CompanyMember> {
        self.by_principal.read().ok()?.get(&principal).copied()
    }
}
