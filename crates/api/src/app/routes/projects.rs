//! Project routes.
//!
//! Project-level scope is company co-membership; the role catalog carries
//! the rest. Archive toggles report whether anything changed so re-archiving
//! an archived project reads as a clean no-op.

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use bugtrail_auth::{project_scope, Action, CompanyMember, Role};
use bugtrail_core::{AggregateId, DomainError, MemberId};
use bugtrail_projects::{
    ArchiveProject, AssignManager, AssignMember, CreateProject, DeleteProject, ProjectCommand,
    ProjectId, ProjectPriority, UnarchiveProject, UnassignMember, UpdateProjectDetails,
};

use crate::app::errors::IntoApiResult;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/projects/mine", get(list_my_projects))
        .route(
            "/projects/:project_id",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/:project_id/archive", post(archive_project))
        .route("/projects/:project_id/unarchive", post(unarchive_project))
        .route("/projects/:project_id/manager", put(assign_manager))
        .route("/projects/:project_id/members", post(assign_member))
        .route(
            "/projects/:project_id/members/:member_id",
            axum::routing::delete(unassign_member),
        )
}

fn parse_project_id(raw: &str) -> Result<ProjectId, DomainError> {
    Ok(ProjectId::new(raw.parse::<AggregateId>()?))
}

/// Resolve the project and run the ownership scope check.
fn scoped_project(
    services: &AppServices,
    member: &CompanyMember,
    project_id: ProjectId,
) -> Result<(), DomainError> {
    let scope = services.projects().scope(member.company_id, &project_id);
    project_scope(member, scope.as_ref()).into_result()
}

#[derive(Debug, Deserialize)]
struct CreateProjectRequest {
    name: String,
    #[serde(default)]
    description: String,
    due_date: Option<DateTime<Utc>>,
    priority: Option<ProjectPriority>,
}

async fn create_project(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::ProjectCreate)
        .api()?;

    let project_id = ProjectId::new(AggregateId::new());
    let committed = services
        .dispatch_project(
            member.company_id,
            project_id,
            ProjectCommand::Create(CreateProject {
                company_id: member.company_id,
                project_id,
                name: body.name,
                description: body.description,
                due_date: body.due_date,
                priority: body.priority.unwrap_or(ProjectPriority::Medium),
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "project_id": project_id,
            "events_committed": committed.len(),
        })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct ListProjectsQuery {
    archived: Option<bool>,
}

async fn list_projects(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Response, Response> {
    let member = services.pipeline().member(principal.principal_id).api()?;
    Ok(Json(services.projects().list(member.company_id, query.archived)).into_response())
}

/// Projects the caller manages or is assigned to.
async fn list_my_projects(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::ProjectViewMine)
        .api()?;
    Ok(Json(services.projects().list_mine(member.company_id, member.member_id)).into_response())
}

async fn get_project(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(project_id): Path<String>,
) -> Result<Response, Response> {
    let member = services.pipeline().member(principal.principal_id).api()?;
    let project_id = parse_project_id(&project_id).api()?;
    scoped_project(&services, &member, project_id).api()?;

    let model = services
        .projects()
        .get(member.company_id, &project_id)
        .ok_or(DomainError::NotFound)
        .api()?;
    Ok(Json(model).into_response())
}

#[derive(Debug, Deserialize)]
struct UpdateProjectRequest {
    name: Option<String>,
    description: Option<String>,
    due_date: Option<DateTime<Utc>>,
    priority: Option<ProjectPriority>,
}

/// Edit project details. While archived, only name/description edits pass;
/// the aggregate rejects a request that also touches due date or priority.
async fn update_project(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(project_id): Path<String>,
    Json(body): Json<UpdateProjectRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::ProjectEdit)
        .api()?;
    let project_id = parse_project_id(&project_id).api()?;
    scoped_project(&services, &member, project_id).api()?;

    let committed = services
        .dispatch_project(
            member.company_id,
            project_id,
            ProjectCommand::UpdateDetails(UpdateProjectDetails {
                company_id: member.company_id,
                project_id,
                name: body.name,
                description: body.description,
                due_date: body.due_date,
                priority: body.priority,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

async fn delete_project(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(project_id): Path<String>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::ProjectDelete)
        .api()?;
    let project_id = parse_project_id(&project_id).api()?;
    scoped_project(&services, &member, project_id).api()?;

    services
        .dispatch_project(
            member.company_id,
            project_id,
            ProjectCommand::Delete(DeleteProject {
                company_id: member.company_id,
                project_id,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn archive_project(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(project_id): Path<String>,
) -> Result<Response, Response> {
    toggle_archive(services, principal, &project_id, true).await
}

async fn unarchive_project(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(project_id): Path<String>,
) -> Result<Response, Response> {
    toggle_archive(services, principal, &project_id, false).await
}

async fn toggle_archive(
    services: AppServices,
    principal: PrincipalContext,
    project_id: &str,
    archive: bool,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::ProjectArchive)
        .api()?;
    let project_id = parse_project_id(project_id).api()?;
    scoped_project(&services, &member, project_id).api()?;

    let command = if archive {
        ProjectCommand::Archive(ArchiveProject {
            company_id: member.company_id,
            project_id,
            actor: member.member_id,
            occurred_at: Utc::now(),
        })
    } else {
        ProjectCommand::Unarchive(UnarchiveProject {
            company_id: member.company_id,
            project_id,
            actor: member.member_id,
            occurred_at: Utc::now(),
        })
    };
    let committed = services
        .dispatch_project(member.company_id, project_id, command)
        .api()?;

    Ok(Json(json!({
        "archived": archive,
        "changed": !committed.is_empty(),
    }))
    .into_response())
}

#[derive(Debug, Deserialize)]
struct AssignManagerRequest {
    member_id: MemberId,
}

/// Hand the project to a manager. Admin-only, and the target seat must hold
/// the ProjectManager role.
async fn assign_manager(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(project_id): Path<String>,
    Json(body): Json<AssignManagerRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::ProjectAssignManager)
        .api()?;
    let project_id = parse_project_id(&project_id).api()?;
    scoped_project(&services, &member, project_id).api()?;

    let seat = services.roster_seat(member.company_id, body.member_id).api()?;
    if seat.role != Role::ProjectManager {
        return Err(crate::app::errors::domain_error_response(
            &DomainError::validation("assigned manager must hold the project manager role"),
        ));
    }

    let committed = services
        .dispatch_project(
            member.company_id,
            project_id,
            ProjectCommand::AssignManager(AssignManager {
                company_id: member.company_id,
                project_id,
                manager_id: body.member_id,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

#[derive(Debug, Deserialize)]
struct AssignMemberRequest {
    member_id: MemberId,
}

async fn assign_member(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(project_id): Path<String>,
    Json(body): Json<AssignMemberRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::ProjectAssignMembers)
        .api()?;
    let project_id = parse_project_id(&project_id).api()?;
    scoped_project(&services, &member, project_id).api()?;
    services.roster_seat(member.company_id, body.member_id).api()?;

    let committed = services
        .dispatch_project(
            member.company_id,
            project_id,
            ProjectCommand::AssignMember(AssignMember {
                company_id: member.company_id,
                project_id,
                member_id: body.member_id,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

async fn unassign_member(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path((project_id, member_id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::ProjectAssignMembers)
        .api()?;
    let project_id = parse_project_id(&project_id).api()?;
    let member_id = member_id.parse::<MemberId>().api()?;
    scoped_project(&services, &member, project_id).api()?;

    let committed = services
        .dispatch_project(
            member.company_id,
            project_id,
            ProjectCommand::UnassignMember(UnassignMember {
                company_id: member.company_id,
                project_id,
                member_id,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}
