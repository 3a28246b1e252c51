//! `bugtrail-projects` — project aggregate (archivable, company-owned).

pub mod project;

pub use project::{
    ArchiveProject, AssignManager, AssignMember, CreateProject, DeleteProject, ManagerAssigned,
    MemberAssigned, MemberUnassigned, Project, ProjectArchived, ProjectCommand, ProjectCreated,
    ProjectDeleted, ProjectDetailsUpdated, ProjectEvent, ProjectId, ProjectPriority,
    ProjectUnarchived, UnarchiveProject, UnassignMember, UpdateProjectDetails,
};
