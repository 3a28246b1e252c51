use serde::{Deserialize, Serialize};

/// Kind of resource an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Company,
    Project,
    Ticket,
    Comment,
}

/// A gated operation, named "resource.action".
///
/// This is the closed enumeration the role catalog is keyed by. Read
/// operations are not listed: reads are always permitted once scope allows,
/// only mutations (plus the my-projects view) go through the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CompanyEdit,
    CompanyDelete,
    CompanyInviteMember,
    CompanyRemoveMember,
    CompanyChangeMemberRole,

    ProjectCreate,
    ProjectEdit,
    ProjectDelete,
    ProjectArchive,
    ProjectAssignManager,
    ProjectAssignMembers,
    ProjectViewMine,

    TicketCreate,
    TicketEditDetails,
    TicketEditStatus,
    TicketEditType,
    TicketEditPriority,
    TicketAssign,
    TicketArchive,
    TicketDelete,

    CommentCreate,
    CommentEditOwn,
    CommentDeleteOwn,
}

impl Action {
    pub const ALL: [Action; 23] = [
        Action::CompanyEdit,
        Action::CompanyDelete,
        Action::CompanyInviteMember,
        Action::CompanyRemoveMember,
        Action::CompanyChangeMemberRole,
        Action::ProjectCreate,
        Action::ProjectEdit,
        Action::ProjectDelete,
        Action::ProjectArchive,
        Action::ProjectAssignManager,
        Action::ProjectAssignMembers,
        Action::ProjectViewMine,
        Action::TicketCreate,
        Action::TicketEditDetails,
        Action::TicketEditStatus,
        Action::TicketEditType,
        Action::TicketEditPriority,
        Action::TicketAssign,
        Action::TicketArchive,
        Action::TicketDelete,
        Action::CommentCreate,
        Action::CommentEditOwn,
        Action::CommentDeleteOwn,
    ];

    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            Action::CompanyEdit
            | Action::CompanyDelete
            | Action::CompanyInviteMember
            | Action::CompanyRemoveMember
            | Action::CompanyChangeMemberRole => ResourceKind::Company,

            Action::ProjectCreate
            | Action::ProjectEdit
            | Action::ProjectDelete
            | Action::ProjectArchive
            | Action::ProjectAssignManager
            | Action::ProjectAssignMembers
            | Action::ProjectViewMine => ResourceKind::Project,

            Action::TicketCreate
            | Action::TicketEditDetails
            | Action::TicketEditStatus
            | Action::TicketEditType
            | Action::TicketEditPriority
            | Action::TicketAssign
            | Action::TicketArchive
            | Action::TicketDelete => ResourceKind::Ticket,

            Action::CommentCreate | Action::CommentEditOwn | Action::CommentDeleteOwn => {
                ResourceKind::Comment
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CompanyEdit => "company.edit",
            Action::CompanyDelete => "company.delete",
            Action::CompanyInviteMember => "company.invite_member",
            Action::CompanyRemoveMember => "company.remove_member",
            Action::CompanyChangeMemberRole => "company.change_member_role",
            Action::ProjectCreate => "project.create",
            Action::ProjectEdit => "project.edit",
            Action::ProjectDelete => "project.delete",
            Action::ProjectArchive => "project.archive",
            Action::ProjectAssignManager => "project.assign_manager",
            Action::ProjectAssignMembers => "project.assign_members",
            Action::ProjectViewMine => "project.view_mine",
            Action::TicketCreate => "ticket.create",
            Action::TicketEditDetails => "ticket.edit_details",
            Action::TicketEditStatus => "ticket.edit_status",
            Action::TicketEditType => "ticket.edit_type",
            Action::TicketEditPriority => "ticket.edit_priority",
            Action::TicketAssign => "ticket.assign",
            Action::TicketArchive => "ticket.archive",
            Action::TicketDelete => "ticket.delete",
            Action::CommentCreate => "comment.create",
            Action::CommentEditOwn => "comment.edit_own",
            Action::CommentDeleteOwn => "comment.delete_own",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
