use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bugtrail_core::{
    check_mutation, Aggregate, AggregateId, AggregateRoot, ArchiveState, CommentId, CompanyId,
    DomainError, MemberId, MutationKind,
};
use bugtrail_events::Event;
use bugtrail_projects::ProjectId;

/// Ticket identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub AggregateId);

impl TicketId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TicketId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    New,
    InDevelopment,
    Testing,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::New => "new",
            TicketStatus::InDevelopment => "in_development",
            TicketStatus::Testing => "testing",
            TicketStatus::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Defect,
    Feature,
    GeneralTask,
    WorkTask,
    ChangeRequest,
    Enhancement,
}

impl TicketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::Defect => "defect",
            TicketKind::Feature => "feature",
            TicketKind::GeneralTask => "general_task",
            TicketKind::WorkTask => "work_task",
            TicketKind::ChangeRequest => "change_request",
            TicketKind::Enhancement => "enhancement",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }
}

/// Comment on a ticket, editable by its sender until deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: CommentId,
    pub sender_id: MemberId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Aggregate root: Ticket.
///
/// # Invariants
/// - Belongs to exactly one project (and through it one company), fixed at
///   creation.
/// - While archived only the archive toggle and title/description edits are
///   accepted; status/kind/priority/assignee changes and all comment
///   operations are `InvalidState`.
/// - Every state-changing event doubles as the audit record: the history
///   read model is a pure function of the stream, so an entry exists for a
///   mutation exactly when the mutation itself was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    id: TicketId,
    company_id: Option<CompanyId>,
    project_id: Option<ProjectId>,
    title: String,
    description: String,
    submitter_id: Option<MemberId>,
    assignee_id: Option<MemberId>,
    status: TicketStatus,
    kind: TicketKind,
    priority: TicketPriority,
    archive_state: ArchiveState,
    comments: Vec<Comment>,
    deleted: bool,
    version: u64,
    created: bool,
}

impl Ticket {
    pub fn empty(id: TicketId) -> Self {
        Self {
            id,
            company_id: None,
            project_id: None,
            title: String::new(),
            description: String::new(),
            submitter_id: None,
            assignee_id: None,
            status: TicketStatus::New,
            kind: TicketKind::GeneralTask,
            priority: TicketPriority::Medium,
            archive_state: ArchiveState::Active,
            comments: Vec::new(),
            deleted: false,
            version: 0,
            created: false,
        }
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn project_id(&self) -> Option<ProjectId> {
        self.project_id
    }

    pub fn submitter_id(&self) -> Option<MemberId> {
        self.submitter_id
    }

    pub fn assignee_id(&self) -> Option<MemberId> {
        self.assignee_id
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn kind(&self) -> TicketKind {
        self.kind
    }

    pub fn priority(&self) -> TicketPriority {
        self.priority
    }

    pub fn archive_state(&self) -> ArchiveState {
        self.archive_state
    }

    pub fn is_archived(&self) -> bool {
        self.archive_state.is_archived()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    fn comment(&self, comment_id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.comment_id == comment_id)
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if self.company_id != Some(company_id) {
            return Err(DomainError::Forbidden);
        }
        Ok(())
    }
}

impl AggregateRoot for Ticket {
    type Id = TicketId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTicket {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub ticket_id: TicketId,
    pub title: String,
    pub description: String,
    pub kind: TicketKind,
    pub priority: TicketPriority,
    pub submitter_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

/// Title/description carry a details edit; `priority` present makes the
/// update a general mutation, rejected as a whole on an archived ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTicketDetails {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TicketPriority>,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

impl UpdateTicketDetails {
    pub fn mutation_kind(&self) -> MutationKind {
        if self.priority.is_some() {
            MutationKind::General
        } else {
            MutationKind::DetailsEdit
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub status: TicketStatus,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeKind {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub kind: TicketKind,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePriority {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub priority: TicketPriority,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignDeveloper {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub assignee_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveTicket {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnarchiveTicket {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteTicket {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddComment {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub comment_id: CommentId,
    pub message: String,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditComment {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub comment_id: CommentId,
    pub message: String,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteComment {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub comment_id: CommentId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketCommand {
    Open(OpenTicket),
    UpdateDetails(UpdateTicketDetails),
    ChangeStatus(ChangeStatus),
    ChangeKind(ChangeKind),
    ChangePriority(ChangePriority),
    AssignDeveloper(AssignDeveloper),
    Archive(ArchiveTicket),
    Unarchive(UnarchiveTicket),
    Delete(DeleteTicket),
    AddComment(AddComment),
    EditComment(EditComment),
    DeleteComment(DeleteComment),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOpened {
    pub company_id: CompanyId,
    pub project_id: ProjectId,
    pub ticket_id: TicketId,
    pub title: String,
    pub description: String,
    pub kind: TicketKind,
    pub priority: TicketPriority,
    pub submitter_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDetailsUpdated {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub old_priority: Option<TicketPriority>,
    pub new_priority: Option<TicketPriority>,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub old_status: TicketStatus,
    pub new_status: TicketStatus,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindChanged {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub old_kind: TicketKind,
    pub new_kind: TicketKind,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityChanged {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub old_priority: TicketPriority,
    pub new_priority: TicketPriority,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperAssigned {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub old_assignee_id: Option<MemberId>,
    pub new_assignee_id: MemberId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketArchived {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketUnarchived {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDeleted {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAdded {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub comment_id: CommentId,
    pub sender_id: MemberId,
    pub message: String,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEdited {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub comment_id: CommentId,
    pub old_message: String,
    pub new_message: String,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDeleted {
    pub company_id: CompanyId,
    pub ticket_id: TicketId,
    pub comment_id: CommentId,
    pub actor: MemberId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketEvent {
    Opened(TicketOpened),
    DetailsUpdated(TicketDetailsUpdated),
    StatusChanged(StatusChanged),
    KindChanged(KindChanged),
    PriorityChanged(PriorityChanged),
    DeveloperAssigned(DeveloperAssigned),
    Archived(TicketArchived),
    Unarchived(TicketUnarchived),
    Deleted(TicketDeleted),
    CommentAdded(CommentAdded),
    CommentEdited(CommentEdited),
    CommentDeleted(CommentDeleted),
}

impl Event for TicketEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TicketEvent::Opened(_) => "tickets.ticket.opened",
            TicketEvent::DetailsUpdated(_) => "tickets.ticket.details_updated",
            TicketEvent::StatusChanged(_) => "tickets.ticket.status_changed",
            TicketEvent::KindChanged(_) => "tickets.ticket.kind_changed",
            TicketEvent::PriorityChanged(_) => "tickets.ticket.priority_changed",
            TicketEvent::DeveloperAssigned(_) => "tickets.ticket.developer_assigned",
            TicketEvent::Archived(_) => "tickets.ticket.archived",
            TicketEvent::Unarchived(_) => "tickets.ticket.unarchived",
            TicketEvent::Deleted(_) => "tickets.ticket.deleted",
            TicketEvent::CommentAdded(_) => "tickets.comment.added",
            TicketEvent::CommentEdited(_) => "tickets.comment.edited",
            TicketEvent::CommentDeleted(_) => "tickets.comment.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TicketEvent::Opened(e) => e.occurred_at,
            TicketEvent::DetailsUpdated(e) => e.occurred_at,
            TicketEvent::StatusChanged(e) => e.occurred_at,
            TicketEvent::KindChanged(e) => e.occurred_at,
            TicketEvent::PriorityChanged(e) => e.occurred_at,
            TicketEvent::DeveloperAssigned(e) => e.occurred_at,
            TicketEvent::Archived(e) => e.occurred_at,
            TicketEvent::Unarchived(e) => e.occurred_at,
            TicketEvent::Deleted(e) => e.occurred_at,
            TicketEvent::CommentAdded(e) => e.occurred_at,
            TicketEvent::CommentEdited(e) => e.occurred_at,
            TicketEvent::CommentDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Ticket {
    type Command = TicketCommand;
    type Event = TicketEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            TicketEvent::Opened(e) => {
                self.id = e.ticket_id;
                self.company_id = Some(e.company_id);
                self.project_id = Some(e.project_id);
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.kind = e.kind;
                self.priority = e.priority;
                self.submitter_id = Some(e.submitter_id);
                self.status = TicketStatus::New;
                self.archive_state = ArchiveState::Active;
                self.created = true;
            }
            TicketEvent::DetailsUpdated(e) => {
                if let Some(title) = &e.title {
                    self.title = title.clone();
                }
                if let Some(description) = &e.description {
                    self.description = description.clone();
                }
                if let Some(priority) = e.new_priority {
                    self.priority = priority;
                }
            }
            TicketEvent::StatusChanged(e) => {
                self.status = e.new_status;
            }
            TicketEvent::KindChanged(e) => {
                self.kind = e.new_kind;
            }
            TicketEvent::PriorityChanged(e) => {
                self.priority = e.new_priority;
            }
            TicketEvent::DeveloperAssigned(e) => {
                self.assignee_id = Some(e.new_assignee_id);
            }
            TicketEvent::Archived(_) => {
                self.archive_state = ArchiveState::Archived;
            }
            TicketEvent::Unarchived(_) => {
                self.archive_state = ArchiveState::Active;
            }
            TicketEvent::Deleted(_) => {
                self.deleted = true;
            }
            TicketEvent::CommentAdded(e) => {
                self.comments.push(Comment {
                    comment_id: e.comment_id,
                    sender_id: e.sender_id,
                    message: e.message.clone(),
                    created_at: e.occurred_at,
                    updated_at: None,
                });
            }
            TicketEvent::CommentEdited(e) => {
                if let Some(comment) =
                    self.comments.iter_mut().find(|c| c.comment_id == e.comment_id)
                {
                    comment.message = e.new_message.clone();
                    comment.updated_at = Some(e.occurred_at);
                }
            }
            TicketEvent::CommentDeleted(e) => {
                self.comments.retain(|c| c.comment_id != e.comment_id);
            }
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TicketCommand::Open(cmd) => self.handle_open(cmd),
            TicketCommand::UpdateDetails(cmd) => self.handle_update_details(cmd),
            TicketCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
            TicketCommand::ChangeKind(cmd) => self.handle_change_kind(cmd),
            TicketCommand::ChangePriority(cmd) => self.handle_change_priority(cmd),
            TicketCommand::AssignDeveloper(cmd) => self.handle_assign_developer(cmd),
            TicketCommand::Archive(cmd) => self.handle_archive(cmd),
            TicketCommand::Unarchive(cmd) => self.handle_unarchive(cmd),
            TicketCommand::Delete(cmd) => self.handle_delete(cmd),
            TicketCommand::AddComment(cmd) => self.handle_add_comment(cmd),
            TicketCommand::EditComment(cmd) => self.handle_edit_comment(cmd),
            TicketCommand::DeleteComment(cmd) => self.handle_delete_comment(cmd),
        }
    }
}

impl Ticket {
    fn handle_open(&self, cmd: &OpenTicket) -> Result<Vec<TicketEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("ticket already exists"));
        }
        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("ticket title cannot be empty"));
        }

        Ok(vec![TicketEvent::Opened(TicketOpened {
            company_id: cmd.company_id,
            project_id: cmd.project_id,
            ticket_id: cmd.ticket_id,
            title: cmd.title.trim().to_string(),
            description: cmd.description.trim().to_string(),
            kind: cmd.kind,
            priority: cmd.priority,
            submitter_id: cmd.submitter_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_details(
        &self,
        cmd: &UpdateTicketDetails,
    ) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        // An update carrying priority fails wholesale while archived; the
        // title/description part is never applied on its own.
        check_mutation(self.archive_state, cmd.mutation_kind())?;

        if cmd.title.is_none() && cmd.description.is_none() && cmd.priority.is_none() {
            return Err(DomainError::validation("nothing to update"));
        }
        if let Some(title) = &cmd.title {
            if title.trim().is_empty() {
                return Err(DomainError::validation("ticket title cannot be empty"));
            }
        }

        Ok(vec![TicketEvent::DetailsUpdated(TicketDetailsUpdated {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            title: cmd.title.as_deref().map(|s| s.trim().to_string()),
            description: cmd.description.as_deref().map(|s| s.trim().to_string()),
            old_priority: cmd.priority.map(|_| self.priority),
            new_priority: cmd.priority,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        check_mutation(self.archive_state, MutationKind::General)?;

        if self.status == cmd.status {
            return Ok(vec![]);
        }

        Ok(vec![TicketEvent::StatusChanged(StatusChanged {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            old_status: self.status,
            new_status: cmd.status,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_kind(&self, cmd: &ChangeKind) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        check_mutation(self.archive_state, MutationKind::General)?;

        if self.kind == cmd.kind {
            return Ok(vec![]);
        }

        Ok(vec![TicketEvent::KindChanged(KindChanged {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            old_kind: self.kind,
            new_kind: cmd.kind,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_priority(
        &self,
        cmd: &ChangePriority,
    ) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        check_mutation(self.archive_state, MutationKind::General)?;

        if self.priority == cmd.priority {
            return Ok(vec![]);
        }

        Ok(vec![TicketEvent::PriorityChanged(PriorityChanged {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            old_priority: self.priority,
            new_priority: cmd.priority,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign_developer(
        &self,
        cmd: &AssignDeveloper,
    ) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        check_mutation(self.archive_state, MutationKind::General)?;

        if self.assignee_id == Some(cmd.assignee_id) {
            return Ok(vec![]);
        }

        Ok(vec![TicketEvent::DeveloperAssigned(DeveloperAssigned {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            old_assignee_id: self.assignee_id,
            new_assignee_id: cmd.assignee_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_archive(&self, cmd: &ArchiveTicket) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;

        if self.is_archived() {
            return Ok(vec![]);
        }

        Ok(vec![TicketEvent::Archived(TicketArchived {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unarchive(&self, cmd: &UnarchiveTicket) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;

        if !self.is_archived() {
            return Ok(vec![]);
        }

        Ok(vec![TicketEvent::Unarchived(TicketUnarchived {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteTicket) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        // An archived ticket is frozen; it must be unarchived before deletion.
        check_mutation(self.archive_state, MutationKind::General)?;

        Ok(vec![TicketEvent::Deleted(TicketDeleted {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_comment(&self, cmd: &AddComment) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        check_mutation(self.archive_state, MutationKind::General)?;

        if cmd.message.trim().is_empty() {
            return Err(DomainError::validation("comment cannot be empty"));
        }

        Ok(vec![TicketEvent::CommentAdded(CommentAdded {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            comment_id: cmd.comment_id,
            sender_id: cmd.actor,
            message: cmd.message.trim().to_string(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit_comment(&self, cmd: &EditComment) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        check_mutation(self.archive_state, MutationKind::General)?;

        let comment = self.comment(cmd.comment_id).ok_or(DomainError::NotFound)?;
        // Sender-only, even for admins; the route guard checks this too.
        if comment.sender_id != cmd.actor {
            return Err(DomainError::Forbidden);
        }
        if cmd.message.trim().is_empty() {
            return Err(DomainError::validation("comment cannot be empty"));
        }

        Ok(vec![TicketEvent::CommentEdited(CommentEdited {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            comment_id: cmd.comment_id,
            old_message: comment.message.clone(),
            new_message: cmd.message.trim().to_string(),
            actor: cmd.actor,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete_comment(&self, cmd: &DeleteComment) -> Result<Vec<TicketEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_company(cmd.company_id)?;
        check_mutation(self.archive_state, MutationKind::General)?;

        let comment = self.comment(cmd.comment_id).ok_or(DomainError::NotFound)?;
        if comment.sender_id != cmd.actor {
            return Err(DomainError::Forbidden);
        }

        Ok(vec![TicketEvent::CommentDeleted(CommentDeleted {
            company_id: cmd.company_id,
            ticket_id: cmd.ticket_id,
            comment_id: cmd.comment_id,
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

    fn opened_ticket() -> (Ticket, CompanyId, MemberId) {
        let company_id = CompanyId::new();
        let ticket_id = TicketId::new(AggregateId::new());
        let submitter = MemberId::new();
        let mut ticket = Ticket::empty(ticket_id);

        let cmd = TicketCommand::Open(OpenTicket {
            company_id,
            project_id: ProjectId::new(AggregateId::new()),
            ticket_id,
            title: "Login page 500s".to_string(),
            description: "Reproduces on every submit".to_string(),
            kind: TicketKind::Defect,
            priority: TicketPriority::High,
            submitter_id: submitter,
            actor: submitter,
            occurred_at: now(),
        });
        for event in ticket.handle(&cmd).unwrap() {
            ticket.apply(&event);
        }

        (ticket, company_id, submitter)
    }

    fn archive(ticket: &mut Ticket, company_id: CompanyId, actor: MemberId) {
        let cmd = TicketCommand::Archive(ArchiveTicket {
            company_id,
            ticket_id: *ticket.id(),
            actor,
            occurred_at: now(),
        });
        for event in ticket.handle(&cmd).unwrap() {
            ticket.apply(&event);
        }
    }

    #[test]
    fn open_records_submitter_and_defaults_status() {
        let (ticket, _, submitter) = opened_ticket();
        assert_eq!(ticket.submitter_id(), Some(submitter));
        assert_eq!(ticket.status(), TicketStatus::New);
        assert_eq!(ticket.assignee_id(), None);
    }

    #[test]
    fn status_change_carries_old_and_new_value() {
        let (ticket, company_id, actor) = opened_ticket();

        let cmd = TicketCommand::ChangeStatus(ChangeStatus {
            company_id,
            ticket_id: *ticket.id(),
            status: TicketStatus::Testing,
            actor,
            occurred_at: now(),
        });
        let events = ticket.handle(&cmd).unwrap();
        let TicketEvent::StatusChanged(e) = &events[0] else {
            panic!("expected StatusChanged");
        };
        assert_eq!(e.old_status, TicketStatus::New);
        assert_eq!(e.new_status, TicketStatus::Testing);
    }

    #[test]
    fn status_change_to_same_value_is_a_no_op() {
        let (ticket, company_id, actor) = opened_ticket();

        let cmd = TicketCommand::ChangeStatus(ChangeStatus {
            company_id,
            ticket_id: *ticket.id(),
            status: TicketStatus::New,
            actor,
            occurred_at: now(),
        });
        assert!(ticket.handle(&cmd).unwrap().is_empty());
    }

    #[test]
    fn archived_blocks_status_change() {
        let (mut ticket, company_id, actor) = opened_ticket();
        archive(&mut ticket, company_id, actor);

        let cmd = TicketCommand::ChangeStatus(ChangeStatus {
            company_id,
            ticket_id: *ticket.id(),
            status: TicketStatus::Resolved,
            actor,
            occurred_at: now(),
        });
        assert!(matches!(
            ticket.handle(&cmd).unwrap_err(),
            DomainError::InvalidState(_)
        ));
    }

    #[test]
    fn archived_blocks_deletion_until_unarchived() {
        let (mut ticket, company_id, actor) = opened_ticket();
        archive(&mut ticket, company_id, actor);

        let cmd = TicketCommand::Delete(DeleteTicket {
            company_id,
            ticket_id: *ticket.id(),
            actor,
            occurred_at: now(),
        });
        assert!(matches!(
            ticket.handle(&cmd).unwrap_err(),
            DomainError::InvalidState(_)
        ));

        let unarchive = TicketCommand::Unarchive(UnarchiveTicket {
            company_id,
            ticket_id: *ticket.id(),
            actor,
            occurred_at: now(),
        });
        for event in ticket.handle(&unarchive).unwrap() {
            ticket.apply(&event);
        }

        let events = ticket.handle(&cmd).unwrap();
        assert!(matches!(events[0], TicketEvent::Deleted(_)));
    }

    #[test]
    fn archived_permits_title_description_edit() {
        let (mut ticket, company_id, actor) = opened_ticket();
        archive(&mut ticket, company_id, actor);

        let cmd = TicketCommand::UpdateDetails(UpdateTicketDetails {
            company_id,
            ticket_id: *ticket.id(),
            title: Some("Login page 500s (archived repro)".to_string()),
            description: None,
            priority: None,
            actor,
            occurred_at: now(),
        });
        assert_eq!(ticket.handle(&cmd).unwrap().len(), 1);
    }

    #[test]
    fn archived_rejects_details_update_with_priority_wholesale() {
        let (mut ticket, company_id, actor) = opened_ticket();
        archive(&mut ticket, company_id, actor);

        let cmd = TicketCommand::UpdateDetails(UpdateTicketDetails {
            company_id,
            ticket_id: *ticket.id(),
            title: Some("New title".to_string()),
            description: Some("New description".to_string()),
            priority: Some(TicketPriority::Urgent),
            actor,
            occurred_at: now(),
        });
        assert!(matches!(
            ticket.handle(&cmd).unwrap_err(),
            DomainError::InvalidState(_)
        ));
    }

    #[test]
    fn archived_blocks_comment_creation() {
        let (mut ticket, company_id, actor) = opened_ticket();
        archive(&mut ticket, company_id, actor);

        let cmd = TicketCommand::AddComment(AddComment {
            company_id,
            ticket_id: *ticket.id(),
            comment_id: CommentId::new(),
            message: "still broken".to_string(),
            actor,
            occurred_at: now(),
        });
        assert!(matches!(
            ticket.handle(&cmd).unwrap_err(),
            DomainError::InvalidState(_)
        ));
    }

    #[test]
    fn archive_twice_emits_nothing_on_second_call() {
        let (mut ticket, company_id, actor) = opened_ticket();
        archive(&mut ticket, company_id, actor);

        let cmd = TicketCommand::Archive(ArchiveTicket {
            company_id,
            ticket_id: *ticket.id(),
            actor,
            occurred_at: now(),
        });
        assert!(ticket.handle(&cmd).unwrap().is_empty());
    }

    #[test]
    fn only_sender_may_delete_their_comment() {
        let (mut ticket, company_id, sender) = opened_ticket();
        let comment_id = CommentId::new();

        let cmd = TicketCommand::AddComment(AddComment {
            company_id,
            ticket_id: *ticket.id(),
            comment_id,
            message: "triaged".to_string(),
            actor: sender,
            occurred_at: now(),
        });
        for event in ticket.handle(&cmd).unwrap() {
            ticket.apply(&event);
        }

        let other = MemberId::new();
        let cmd = TicketCommand::DeleteComment(DeleteComment {
            company_id,
            ticket_id: *ticket.id(),
            comment_id,
            actor: other,
            occurred_at: now(),
        });
        assert_eq!(ticket.handle(&cmd).unwrap_err(), DomainError::Forbidden);

        let cmd = TicketCommand::DeleteComment(DeleteComment {
            company_id,
            ticket_id: *ticket.id(),
            comment_id,
            actor: sender,
            occurred_at: now(),
        });
        assert_eq!(ticket.handle(&cmd).unwrap().len(), 1);
    }

    #[test]
    fn comment_edit_tracks_updated_at() {
        let (mut ticket, company_id, sender) = opened_ticket();
        let comment_id = CommentId::new();

        let cmd = TicketCommand::AddComment(AddComment {
            company_id,
            ticket_id: *ticket.id(),
            comment_id,
            message: "first pass".to_string(),
            actor: sender,
            occurred_at: now(),
        });
        for event in ticket.handle(&cmd).unwrap() {
            ticket.apply(&event);
        }
        assert!(ticket.comments()[0].updated_at.is_none());

        let cmd = TicketCommand::EditComment(EditComment {
            company_id,
            ticket_id: *ticket.id(),
            comment_id,
            message: "second pass".to_string(),
            actor: sender,
            occurred_at: now(),
        });
        for event in ticket.handle(&cmd).unwrap() {
            ticket.apply(&event);
        }
        assert_eq!(ticket.comments()[0].message, "second pass");
        assert!(ticket.comments()[0].updated_at.is_some());
    }

    #[test]
    fn cross_company_command_is_rejected() {
        let (ticket, _, actor) = opened_ticket();

        let cmd = TicketCommand::Archive(ArchiveTicket {
            company_id: CompanyId::new(),
            ticket_id: *ticket.id(),
            actor,
            occurred_at: now(),
        });
        assert_eq!(ticket.handle(&cmd).unwrap_err(), DomainError::Forbidden);
    }
}
