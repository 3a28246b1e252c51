use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bugtrail_core::{
    check_mutation, Aggregate, AggregateId, AggregateRoot, ArchiveState, CompanyId, DomainError,
    MemberId, MutationKind,
};
use bugtrail_events::Event;

/// Project identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub AggregateId);

impl ProjectId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Project priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Aggregate root: Project.
///
/// # Invariants
/// - The owning company is fixed at creation.
/// - Archival is a reversible flag; while archived only the archive toggle
///   and name/description edits are accepted, everything else is
///   `InvalidState`. A mixed update is rejected wholesale.
/// - Archive/unarchive are idempotent: re-applying the current state emits
///   no events (the caller reports `changed: false`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    id: ProjectId,
    company_id: Option<CompanyId>,
    name: String,
    description: String,
    manager_id: Option<MemberId>,
    assigned_members: Vec<MemberId>,
    archive_state: ArchiveState,
    due_date: Option<DateTime<Utc>>,
    priority: ProjectPriority,
    deleted: bool,
    version: u64,
    created: bool,
}

impl Project {
    /// Create an empty, not-yet-created instance for rehydration.
    pub fn empty(id: ProjectId) -> Self {
        Self {
            id,
            company_id: None,
            name: String::new(),
            description: String::new(),
            manager_id: None,
            assigned_members: Vec::new(),
            archive_state: ArchiveState::Active,
            due_date: None,
            priority: ProjectPriority::Medium,
            deleted: false,
            version: 0,
            created: false,
        }
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn manager_id(&self) -> Option<MemberId> {
        self.manager_id
    }

    pub fn assigned_members(&self) -> &[MemberId] {
        &self.assigned_members
    }

    pub fn archive_state(&self) -> ArchiveState {
        self.archive_state
    }

    pub fn is_archived(&self) -> bool {
        self.archive_state.is_archived()
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        // Defense in depth; the dispatcher already scopes streams by company.
        if self.company_id != Some(company_id) {
            return Err(DomainError::Forbidden);
        }
        Ok(())
    }
}

impl AggregateRoot for Project {
    type Id = ProjectId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateProject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProject {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: ProjectPriority,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateProjectDetails.
///
/// `due_date`/`priority` make this a general mutation; with only
/// `name`/`description` set it counts as a details edit and is permitted
/// while archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProjectDetails {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<ProjectPriority>,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

impl UpdateProjectDetails {
    /// Lifecycle classification for this update as a whole.
    pub fn mutation_kind(&self) -> MutationKind {
        if self.due_date.is_some() || self.priority.is_some() {
            MutationKind::General
        } else {
            MutationKind::DetailsEdit
        }
    }
}

/// Command: AssignManager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignManager {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub manager_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignMember.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignMember {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub member_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UnassignMember.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnassignMember {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub member_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ArchiveProject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveProject {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UnarchiveProject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnarchiveProject {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteProject (company teardown path; not exposed as a
/// day-to-day operation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProject {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectCommand {
    Create(CreateProject),
    UpdateDetails(UpdateProjectDetails),
    AssignManager(AssignManager),
    AssignMember(AssignMember),
    UnassignMember(UnassignMember),
    Archive(ArchiveProject),
    Unarchive(UnarchiveProject),
    Delete(DeleteProject),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreated {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: ProjectPriority,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDetailsUpdated {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<ProjectPriority>,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerAssigned {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub old_manager_id: Option<MemberId>,
    pub new_manager_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAssigned {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub member_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUnassigned {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub member_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectArchived {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUnarchived {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDeleted {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectEvent {
    Created(ProjectCreated),
    DetailsUpdated(ProjectDetailsUpdated),
    ManagerAssigned(ManagerAssigned),
    MemberAssigned(MemberAssigned),
    MemberUnassigned(MemberUnassigned),
    Archived(ProjectArchived),
    Unarchived(ProjectUnarchived),
    Deleted(ProjectDeleted),
}

impl Event for ProjectEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProjectEvent::Created(_) => "projects.project.created",
            ProjectEvent::DetailsUpdated(_) => "projects.project.details_updated",
            ProjectEvent::ManagerAssigned(_) => "projects.project.manager_assigned",
            ProjectEvent::MemberAssigned(_) => "projects.project.member_assigned",
            ProjectEvent::MemberUnassigned(_) => "projects.project.member_unassigned",
            ProjectEvent::Archived(_) => "projects.project.archived",
            ProjectEvent::Unarchived(_) => "projects.project.unarchived",
            ProjectEvent::Deleted(_) => "projects.project.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProjectEvent::Created(e) => e.occurred_at,
            ProjectEvent::DetailsUpdated(e) => e.occurred_at,
            ProjectEvent::ManagerAssigned(e) => e.occurred_at,
            ProjectEvent::MemberAssigned(e) => e.occurred_at,
            ProjectEvent::MemberUnassigned(e) => e.occurred_at,
            ProjectEvent::Archived(e) => e.occurred_at,
            ProjectEvent::Unarchived(e) => e.occurred_at,
            ProjectEvent::Deleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Project {
    type Command = ProjectCommand;
    type Event = ProjectEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProjectEvent::Created(e) => {
                self.id = e.project_id;
                self.company_id = Some(e.company_id);
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.due_date = e.due_date;
                self.priority = e.priority;
                self.archive_state = ArchiveState::Active;
                self.created = true;
            }
            ProjectEvent::DetailsUpdated(e) => {
                if let Some(name) = &e.name {
                    self.name = name.clone();
                }
                if let Some(description) = &e.description {
                    self.description = description.clone();
                }
                if let Some(due_date) = e.due_date {
                    self.due_date = Some(due_date);
                }
                if let Some(priority) = e.priority {
                    self.priority = priority;
                }
            }
            ProjectEvent::ManagerAssigned(e) => {
                self.manager_id = Some(e.new_manager_id);
            }
            ProjectEvent::MemberAssigned(e) => {
                self.assigned_members.push(e.member_id);
            }
            ProjectEvent::MemberUnassigned(e) => {
                self.assigned_members.retain(|m| *m != e.member_id);
            }
            ProjectEvent::Archived(_) => {
                self.archive_state = ArchiveState::Archived;
            }
            ProjectEvent::Unarchived(_) => {
                self.archive_state = ArchiveState::Active;
            }
            ProjectEvent::Deleted(_) => {
                self.deleted = true;
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProjectCommand::Create(cmd) => self.handle_create(cmd),
            ProjectCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            ProjectCommand::AssignManager(cmd) => self.handle_assign_manager(cmd),
            ProjectCommand::AssignMember(cmd) => self.handle_assign_member(cmd),
            ProjectCommand::UnassignMember(cmd) => self.handle_unassign_member(cmd),
            ProjectCommand::Archive(cmd) => self.handle_archive(cmd),
            ProjectCommand::Unarchive(cmd) => self.handle_unarchive(cmd),
            ProjectCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Project {
    fn handle_create(&self, cmd: &CreateProject) -> Result<Vec<ProjectEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("project already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("project name cannot be empty"));
        }

        Ok(vec![ProjectEvent::Created(ProjectCreated {
            company_id: cmd.company_id,
            project_id: cmd.project_id,
            name: cmd.name.trim().to_string(),
            description: cmd.description.trim().to_string(),
            due_date: cmd.due_date,
            priority: cmd.priority,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateProjectDetails,
    ) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        // Rejected as a whole when archived and the update carries more
        // than name/description (no partial application).
        check_mutation(self.archive_state, cmd.mutation_kind())?;

        if cmd.name.is_none()
            && cmd.description.is_none()
            && cmd.due_date.is_none()
            && cmd.priority.is_none()
        {
            return Err(DomainError::validation("nothing to update"));
        }
        if let Some(name) = &cmd.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("project name cannot be empty"));
            }
        }

        Ok(vec![ProjectEvent::DetailsUpdated(ProjectDetailsUpdated {
            company_id: cmd.company_id,
            project_id: cmd.project_id,
            name: cmd.name.as_deref().map(|s| s.trim().to_string()),
            description: cmd.description.as_deref().map(|s| s.trim().to_string()),
            due_date: cmd.due_date,
            priority: cmd.priority,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_manager(&self, cmd: &AssignManager) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        check_mutation(self.archive_state, MutationKind::General)?;

        if self.manager_id == Some(cmd.manager_id) {
            return Ok(vec![]);
        }

        Ok(vec![ProjectEvent::ManagerAssigned(ManagerAssigned {
            company_id: cmd.company_id,
            project_id: cmd.project_id,
            old_manager_id: self.manager_id,
            new_manager_id: cmd.manager_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_member(&self, cmd: &AssignMember) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        check_mutation(self.archive_state, MutationKind::General)?;

        if self.assigned_members.contains(&cmd.member_id) {
            return Ok(vec![]);
        }

        Ok(vec![ProjectEvent::MemberAssigned(MemberAssigned {
            company_id: cmd.company_id,
            project_id: cmd.project_id,
            member_id: cmd.member_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unassign_member(
        &self,
        cmd: &UnassignMember,
    ) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        check_mutation(self.archive_state, MutationKind::General)?;

        if !self.assigned_members.contains(&cmd.member_id) {
            return Err(DomainError::validation("member is not assigned"));
        }

        Ok(vec![ProjectEvent::MemberUnassigned(MemberUnassigned {
            company_id: cmd.company_id,
            project_id: cmd.project_id,
            member_id: cmd.member_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveProject) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;

        if self.is_archived() {
            // Idempotent: already archived, nothing changed.
            return Ok(vec![]);
        }

        Ok(vec![ProjectEvent::Archived(ProjectArchived {
            company_id: cmd.company_id,
            project_id: cmd.project_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unarchive(&self, cmd: &UnarchiveProject) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;

        if !self.is_archived() {
            return Ok(vec![]);
        }

        Ok(vec![ProjectEvent::Unarchived(ProjectUnarchived {
            company_id: cmd.company_id,
            project_id: cmd.project_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteProject) -> Result<Vec<ProjectEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;

        Ok(vec![ProjectEvent::Deleted(ProjectDeleted {
            company_id: cmd.company_id,
            project_id: cmd.project_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }
}
