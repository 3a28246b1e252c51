use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bugtrail_core::{Aggregate, AggregateRoot, CompanyId, DomainError, MemberId};
use bugtrail_auth::{PrincipalId, Role};
use bugtrail_events::Event;

/// One member's seat in the company roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub member_id: MemberId,
    pub principal_id: PrincipalId,
    pub role: Role,
}

/// Aggregate root: Company (the tenant boundary).
///
/// # Invariants
/// - A principal holds at most one seat in the company.
/// - The company always retains at least one Admin.
/// - A deleted company accepts no further commands (NotFound).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    id: CompanyId,
    name: String,
    description: String,
    members: Vec<MemberRecord>,
    deleted: bool,
    version: u64,
    created: bool,
}

impl Company {
    /// Create an empty, not-yet-registered instance for rehydration.
    pub fn empty(id: CompanyId) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            members: Vec::new(),
            deleted: false,
            version: 0,
            created: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn members(&self) -> &[MemberRecord] {
        &self.members
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn member(&self, member_id: MemberId) -> Option<&MemberRecord> {
        self.members.iter().find(|m| m.member_id == member_id)
    }

    fn admin_count(&self) -> usize {
        self.members.iter().filter(|m| m.role == Role::Admin).count()
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }
}

impl AggregateRoot for Company {
    type Id = CompanyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: register a new company; the creator is seeded as its first Admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterCompany {
    pub company_id: CompanyId,
    pub name: String,
    pub description: String,
    pub creator_member_id: MemberId,
    pub creator_principal_id: PrincipalId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: edit company name/description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCompanyDetails {
    pub company_id: CompanyId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: seat a principal in the company with a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteMember {
    pub company_id: CompanyId,
    pub member_id: MemberId,
    pub principal_id: PrincipalId,
    pub role: Role,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: remove a member's seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveMember {
    pub company_id: CompanyId,
    pub member_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: change a member's role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMemberRole {
    pub company_id: CompanyId,
    pub member_id: MemberId,
    pub role: Role,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: tear the company down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCompany {
    pub company_id: CompanyId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyCommand {
    Register(RegisterCompany),
    UpdateDetails(UpdateCompanyDetails),
    InviteMember(InviteMember),
    RemoveMember(RemoveMember),
    ChangeMemberRole(ChangeMemberRole),
    Delete(DeleteCompany),
}

/// Event: company registered (creator seeded as Admin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRegistered {
    pub company_id: CompanyId,
    pub name: String,
    pub description: String,
    pub creator_member_id: MemberId,
    pub creator_principal_id: PrincipalId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDetailsUpdated {
    pub company_id: CompanyId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInvited {
    pub company_id: CompanyId,
    pub member_id: MemberId,
    pub principal_id: PrincipalId,
    pub role: Role,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRemoved {
    pub company_id: CompanyId,
    pub member_id: MemberId,
    pub principal_id: PrincipalId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRoleChanged {
    pub company_id: CompanyId,
    pub member_id: MemberId,
    pub old_role: Role,
    pub new_role: Role,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDeleted {
    pub company_id: CompanyId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanyEvent {
    Registered(CompanyRegistered),
    DetailsUpdated(CompanyDetailsUpdated),
    MemberInvited(MemberInvited),
    MemberRemoved(MemberRemoved),
    MemberRoleChanged(MemberRoleChanged),
    Deleted(CompanyDeleted),
}

impl Event for CompanyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CompanyEvent::Registered(_) => "company.registered",
            CompanyEvent::DetailsUpdated(_) => "company.details_updated",
            CompanyEvent::MemberInvited(_) => "company.member_invited",
            CompanyEvent::MemberRemoved(_) => "company.member_removed",
            CompanyEvent::MemberRoleChanged(_) => "company.member_role_changed",
            CompanyEvent::Deleted(_) => "company.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CompanyEvent::Registered(e) => e.occurred_at,
            CompanyEvent::DetailsUpdated(e) => e.occurred_at,
            CompanyEvent::MemberInvited(e) => e.occurred_at,
            CompanyEvent::MemberRemoved(e) => e.occurred_at,
            CompanyEvent::MemberRoleChanged(e) => e.occurred_at,
            CompanyEvent::Deleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Company {
    type Command = CompanyCommand;
    type Event = CompanyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CompanyEvent::Registered(e) => {
                self.id = e.company_id;
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.members = vec![MemberRecord {
                    member_id: e.creator_member_id,
                    principal_id: e.creator_principal_id,
                    role: Role::Admin,
                }];
                self.created = true;
            }
            CompanyEvent::DetailsUpdated(e) => {
                if let Some(name) = &e.name {
                    self.name = name.clone();
                }
                if let Some(description) = &e.description {
                    self.description = description.clone();
                }
            }
            CompanyEvent::MemberInvited(e) => {
                self.members.push(MemberRecord {
                    member_id: e.member_id,
                    principal_id: e.principal_id,
                    role: e.role,
                });
            }
            CompanyEvent::MemberRemoved(e) => {
                self.members.retain(|m| m.member_id != e.member_id);
            }
            CompanyEvent::MemberRoleChanged(e) => {
                if let Some(m) = self.members.iter_mut().find(|m| m.member_id == e.member_id) {
                    m.role = e.new_role;
                }
            }
            CompanyEvent::Deleted(_) => {
                self.deleted = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CompanyCommand::Register(cmd) => self.handle_register(cmd),
            CompanyCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            CompanyCommand::InviteMember(cmd) => self.handle_invite(cmd),
            CompanyCommand::RemoveMember(cmd) => self.handle_remove(cmd),
            CompanyCommand::ChangeMemberRole(cmd) => self.handle_change_role(cmd),
            CompanyCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Company {
    fn handle_register(&self, cmd: &RegisterCompany) -> Result<Vec<CompanyEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("company already registered"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("company name cannot be empty"));
        }

        Ok(vec![CompanyEvent::Registered(CompanyRegistered {
            company_id: cmd.company_id,
            name: cmd.name.trim().to_string(),
            description: cmd.description.trim().to_string(),
            creator_member_id: cmd.creator_member_id,
            creator_principal_id: cmd.creator_principal_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateCompanyDetails,
    ) -> Result<Vec<CompanyEvent>, DomainError> {
        self.ensure_live()?;

        if cmd.name.is_none() && cmd.description.is_none() {
            return Err(DomainError::validation("nothing to update"));
        }
        if let Some(name) = &cmd.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("company name cannot be empty"));
            }
        }

        Ok(vec![CompanyEvent::DetailsUpdated(CompanyDetailsUpdated {
            company_id: cmd.company_id,
            name: cmd.name.as_deref().map(|s| s.trim().to_string()),
            description: cmd.description.as_deref().map(|s| s.trim().to_string()),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_invite(&self, cmd: &InviteMember) -> Result<Vec<CompanyEvent>, DomainError> {
        self.ensure_live()?;

        if self
            .members
            .iter()
            .any(|m| m.principal_id == cmd.principal_id)
        {
            return Err(DomainError::conflict("principal is already a member"));
        }
        if self.members.iter().any(|m| m.member_id == cmd.member_id) {
            return Err(DomainError::conflict("member id already in use"));
        }

        Ok(vec![CompanyEvent::MemberInvited(MemberInvited {
            company_id: cmd.company_id,
            member_id: cmd.member_id,
            principal_id: cmd.principal_id,
            role: cmd.role,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveMember) -> Result<Vec<CompanyEvent>, DomainError> {
        self.ensure_live()?;

        let member = self.member(cmd.member_id).ok_or(DomainError::NotFound)?;
        if member.role == Role::Admin && self.admin_count() == 1 {
            return Err(DomainError::conflict("cannot remove the last admin"));
        }

        Ok(vec![CompanyEvent::MemberRemoved(MemberRemoved {
            company_id: cmd.company_id,
            member_id: cmd.member_id,
            principal_id: member.principal_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_role(&self, cmd: &ChangeMemberRole) -> Result<Vec<CompanyEvent>, DomainError> {
        self.ensure_live()?;

        let member = self.member(cmd.member_id).ok_or(DomainError::NotFound)?;
        if member.role == cmd.role {
            // Idempotent: the seat already has the requested role.
            return Ok(vec![]);
        }
        if member.role == Role::Admin && self.admin_count() == 1 {
            return Err(DomainError::conflict("cannot demote the last admin"));
        }

        Ok(vec![CompanyEvent::MemberRoleChanged(MemberRoleChanged {
            company_id: cmd.company_id,
            member_id: cmd.member_id,
            old_role: member.role,
            new_role: cmd.role,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteCompany) -> Result<Vec<CompanyEvent>, DomainError> {
        self.ensure_live()?;

        Ok(vec![CompanyEvent::Deleted(CompanyDeleted {
            company_id: cmd.company_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn registered_company() -> (Company, MemberId) {
        let company_id = CompanyId::new();
        let creator = MemberId::new();
        let mut company = Company::empty(company_id);

        let cmd = CompanyCommand::Register(RegisterCompany {
            company_id,
            name: "Acme".to_string(),
            description: "Widgets".to_string(),
            creator_member_id: creator,
            creator_principal_id: PrincipalId::new(),
            occurred_at: now(),
        });
        for event in company.handle(&cmd).unwrap() {
            company.apply(&event);
        }

        (company, creator)
    }

    fn invite(company: &mut Company, role: Role) -> MemberId {
        let member_id = MemberId::new();
        let actor = company.members()[0].member_id;
        let cmd = CompanyCommand::InviteMember(InviteMember {
            company_id: *company.id(),
            member_id,
            principal_id: PrincipalId::new(),
            role,
            actor,
            occurred_at: now(),
        });
        for event in company.handle(&cmd).unwrap() {
            company.apply(&event);
        }
        member_id
    }

    #[test]
    fn register_seeds_creator_as_admin() {
        let (company, creator) = registered_company();

        assert_eq!(company.members().len(), 1);
        assert_eq!(company.members()[0].member_id, creator);
        assert_eq!(company.members()[0].role, Role::Admin);
    }

    #[test]
    fn register_twice_is_a_conflict() {
        let (company, _) = registered_company();

        let cmd = CompanyCommand::Register(RegisterCompany {
            company_id: *company.id(),
            name: "Again".to_string(),
            description: String::new(),
            creator_member_id: MemberId::new(),
            creator_principal_id: PrincipalId::new(),
            occurred_at: now(),
        });
        assert!(matches!(
            company.handle(&cmd).unwrap_err(),
            DomainError::Conflict(_)
        ));
    }

    #[test]
    fn duplicate_principal_invite_is_a_conflict() {
        let (mut company, creator) = registered_company();
        let principal = company.members()[0].principal_id;
        let _dev = invite(&mut company, Role::Developer);

        let cmd = CompanyCommand::InviteMember(InviteMember {
            company_id: *company.id(),
            member_id: MemberId::new(),
            principal_id: principal,
            role: Role::Submitter,
            actor: creator,
            occurred_at: now(),
        });
        assert!(matches!(
            company.handle(&cmd).unwrap_err(),
            DomainError::Conflict(_)
        ));
    }

    #[test]
    fn cannot_remove_last_admin() {
        let (mut company, creator) = registered_company();
        let dev = invite(&mut company, Role::Developer);

        let cmd = CompanyCommand::RemoveMember(RemoveMember {
            company_id: *company.id(),
            member_id: creator,
            actor: creator,
            occurred_at: now(),
        });
        assert!(matches!(
            company.handle(&cmd).unwrap_err(),
            DomainError::Conflict(_)
        ));

        // Removing a non-admin seat is fine.
        let cmd = CompanyCommand::RemoveMember(RemoveMember {
            company_id: *company.id(),
            member_id: dev,
            actor: creator,
            occurred_at: now(),
        });
        let events = company.handle(&cmd).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn role_change_records_old_and_new() {
        let (mut company, creator) = registered_company();
        let dev = invite(&mut company, Role::Developer);

        let cmd = CompanyCommand::ChangeMemberRole(ChangeMemberRole {
            company_id: *company.id(),
            member_id: dev,
            role: Role::ProjectManager,
            actor: creator,
            occurred_at: now(),
        });
        let events = company.handle(&cmd).unwrap();

        let CompanyEvent::MemberRoleChanged(e) = &events[0] else {
            panic!("expected MemberRoleChanged");
        };
        assert_eq!(e.old_role, Role::Developer);
        assert_eq!(e.new_role, Role::ProjectManager);
    }

    #[test]
    fn role_change_to_same_role_is_a_noop() {
        let (mut company, creator) = registered_company();
        let dev = invite(&mut company, Role::Developer);

        let cmd = CompanyCommand::ChangeMemberRole(ChangeMemberRole {
            company_id: *company.id(),
            member_id: dev,
            role: Role::Developer,
            actor: creator,
            occurred_at: now(),
        });
        assert!(company.handle(&cmd).unwrap().is_empty());
    }

    #[test]
    fn deleted_company_reports_not_found() {
        let (mut company, creator) = registered_company();

        let cmd = CompanyCommand::Delete(DeleteCompany {
            company_id: *company.id(),
            actor: creator,
            occurred_at: now(),
        });
        for event in company.handle(&cmd).unwrap() {
            company.apply(&event);
        }

        let cmd = CompanyCommand::UpdateDetails(UpdateCompanyDetails {
            company_id: *company.id(),
            name: Some("Ghost".to_string()),
            description: None,
            actor: creator,
            occurred_at: now(),
        });
        assert_eq!(company.handle(&cmd).unwrap_err(), DomainError::NotFound);
    }
}
