//! Ticket routes, including comments and the audit history.
//!
//! Ticket scope is two-tier: the ownership chain must resolve into the
//! caller's company, then the role decides reach (admins company-wide,
//! managers on their projects, developers/submitters on their own tickets).
//! Comment edit/delete is ownership-bound for every role.

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use bugtrail_auth::{own_comment, ticket_scope, Action, CompanyMember, Role, ScopeVerdict};
use bugtrail_core::{AggregateId, CommentId, DomainError, MemberId, MutationKind};
use bugtrail_projects::ProjectId;
use bugtrail_tickets::{
    AddComment, ArchiveTicket, AssignDeveloper, ChangeKind, ChangePriority, ChangeStatus,
    DeleteComment, DeleteTicket, EditComment, OpenTicket, TicketCommand, TicketId, TicketKind,
    TicketPriority, TicketStatus, UnarchiveTicket, UpdateTicketDetails,
};

use crate::app::errors::{domain_error_response, IntoApiResult};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;
use crate::pipeline::ensure_live;

pub fn router() -> Router {
    Router::new()
        .route("/tickets", get(list_tickets).post(create_ticket))
        .route(
            "/tickets/:ticket_id",
            get(get_ticket).patch(update_ticket).delete(delete_ticket),
        )
        .route("/tickets/:ticket_id/status", put(change_status))
        .route("/tickets/:ticket_id/kind", put(change_kind))
        .route("/tickets/:ticket_id/priority", put(change_priority))
        .route("/tickets/:ticket_id/assignee", put(assign_developer))
        .route("/tickets/:ticket_id/archive", post(archive_ticket))
        .route("/tickets/:ticket_id/unarchive", post(unarchive_ticket))
        .route(
            "/tickets/:ticket_id/comments",
            get(list_comments).post(add_comment),
        )
        .route(
            "/tickets/:ticket_id/comments/:comment_id",
            axum::routing::patch(edit_comment).delete(delete_comment),
        )
        .route("/tickets/:ticket_id/history", get(list_history))
}

fn parse_ticket_id(raw: &str) -> Result<TicketId, DomainError> {
    Ok(TicketId::new(raw.parse::<AggregateId>()?))
}

/// Run the two-tier scope check against the assembled ownership chain.
fn scoped_ticket(
    services: &AppServices,
    member: &CompanyMember,
    ticket_id: &TicketId,
) -> Result<(), DomainError> {
    let snapshot = services.ticket_scope_snapshot(member.company_id, ticket_id);
    ticket_scope(member, snapshot.as_ref()).into_result()
}

#[derive(Debug, Deserialize)]
struct CreateTicketRequest {
    project_id: ProjectId,
    title: String,
    #[serde(default)]
    description: String,
    kind: TicketKind,
    priority: Option<TicketPriority>,
}

/// Open a ticket under a project. The project must resolve, and an archived
/// project accepts no new tickets.
async fn create_ticket(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<CreateTicketRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::TicketCreate)
        .api()?;

    let project = services
        .projects()
        .get(member.company_id, &body.project_id)
        .ok_or(DomainError::NotFound)
        .api()?;
    ensure_live(project.archived, MutationKind::General).api()?;

    let ticket_id = TicketId::new(AggregateId::new());
    let committed = services
        .dispatch_ticket(
            member.company_id,
            ticket_id,
            TicketCommand::Open(OpenTicket {
                company_id: member.company_id,
                project_id: body.project_id,
                ticket_id,
                title: body.title,
                description: body.description,
                kind: body.kind,
                priority: body.priority.unwrap_or(TicketPriority::Medium),
                submitter_id: member.member_id,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "ticket_id": ticket_id,
            "events_committed": committed.len(),
        })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
struct ListTicketsQuery {
    project_id: Option<ProjectId>,
    archived: Option<bool>,
}

/// List tickets visible to the caller, per the same scope rules that gate
/// single-ticket reads.
async fn list_tickets(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<ListTicketsQuery>,
) -> Result<Response, Response> {
    let member = services.pipeline().member(principal.principal_id).api()?;

    let visible: Vec<_> = services
        .tickets()
        .list(member.company_id, query.project_id, query.archived)
        .into_iter()
        .filter(|t| {
            let snapshot = services.ticket_scope_snapshot(member.company_id, &t.ticket_id);
            ticket_scope(&member, snapshot.as_ref()) == ScopeVerdict::Allow
        })
        .collect();

    Ok(Json(visible).into_response())
}

async fn get_ticket(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
) -> Result<Response, Response> {
    let member = services.pipeline().member(principal.principal_id).api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    let model = services
        .tickets()
        .get(member.company_id, &ticket_id)
        .ok_or(DomainError::NotFound)
        .api()?;
    Ok(Json(model).into_response())
}

#[derive(Debug, Deserialize)]
struct UpdateTicketRequest {
    title: Option<String>,
    description: Option<String>,
    priority: Option<TicketPriority>,
}

/// Edit ticket details. Title/description edits pass on an archived ticket;
/// a request that also changes priority is rejected as a whole.
async fn update_ticket(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
    Json(body): Json<UpdateTicketRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::TicketEditDetails)
        .api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    let committed = services
        .dispatch_ticket(
            member.company_id,
            ticket_id,
            TicketCommand::UpdateDetails(UpdateTicketDetails {
                company_id: member.company_id,
                ticket_id,
                title: body.title,
                description: body.description,
                priority: body.priority,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

#[derive(Debug, Deserialize)]
struct ChangeStatusRequest {
    status: TicketStatus,
}

async fn change_status(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
    Json(body): Json<ChangeStatusRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::TicketEditStatus)
        .api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    let committed = services
        .dispatch_ticket(
            member.company_id,
            ticket_id,
            TicketCommand::ChangeStatus(ChangeStatus {
                company_id: member.company_id,
                ticket_id,
                status: body.status,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

#[derive(Debug, Deserialize)]
struct ChangeKindRequest {
    kind: TicketKind,
}

async fn change_kind(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
    Json(body): Json<ChangeKindRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::TicketEditType)
        .api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    let committed = services
        .dispatch_ticket(
            member.company_id,
            ticket_id,
            TicketCommand::ChangeKind(ChangeKind {
                company_id: member.company_id,
                ticket_id,
                kind: body.kind,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

#[derive(Debug, Deserialize)]
struct ChangePriorityRequest {
    priority: TicketPriority,
}

async fn change_priority(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
    Json(body): Json<ChangePriorityRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::TicketEditPriority)
        .api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    let committed = services
        .dispatch_ticket(
            member.company_id,
            ticket_id,
            TicketCommand::ChangePriority(ChangePriority {
                company_id: member.company_id,
                ticket_id,
                priority: body.priority,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

#[derive(Debug, Deserialize)]
struct AssignDeveloperRequest {
    assignee_id: MemberId,
}

/// Assign a developer. The target seat must exist and hold the Developer
/// role.
async fn assign_developer(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
    Json(body): Json<AssignDeveloperRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::TicketAssign)
        .api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    let seat = services
        .roster_seat(member.company_id, body.assignee_id)
        .api()?;
    if seat.role != Role::Developer {
        return Err(domain_error_response(&DomainError::validation(
            "assignee must hold the developer role",
        )));
    }

    let committed = services
        .dispatch_ticket(
            member.company_id,
            ticket_id,
            TicketCommand::AssignDeveloper(AssignDeveloper {
                company_id: member.company_id,
                ticket_id,
                assignee_id: body.assignee_id,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

async fn archive_ticket(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
) -> Result<Response, Response> {
    toggle_archive(services, principal, &ticket_id, true).await
}

async fn unarchive_ticket(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
) -> Result<Response, Response> {
    toggle_archive(services, principal, &ticket_id, false).await
}

async fn toggle_archive(
    services: AppServices,
    principal: PrincipalContext,
    ticket_id: &str,
    archive: bool,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::TicketArchive)
        .api()?;
    let ticket_id = parse_ticket_id(ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    let command = if archive {
        TicketCommand::Archive(ArchiveTicket {
            company_id: member.company_id,
            ticket_id,
            actor: member.member_id,
            occurred_at: Utc::now(),
        })
    } else {
        TicketCommand::Unarchive(UnarchiveTicket {
            company_id: member.company_id,
            ticket_id,
            actor: member.member_id,
            occurred_at: Utc::now(),
        })
    };
    let committed = services
        .dispatch_ticket(member.company_id, ticket_id, command)
        .api()?;

    Ok(Json(json!({
        "archived": archive,
        "changed": !committed.is_empty(),
    }))
    .into_response())
}

async fn delete_ticket(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::TicketDelete)
        .api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    services
        .dispatch_ticket(
            member.company_id,
            ticket_id,
            TicketCommand::Delete(DeleteTicket {
                company_id: member.company_id,
                ticket_id,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn list_comments(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
) -> Result<Response, Response> {
    let member = services.pipeline().member(principal.principal_id).api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    let comments = services
        .tickets()
        .comments(member.company_id, &ticket_id)
        .ok_or(DomainError::NotFound)
        .api()?;
    Ok(Json(comments).into_response())
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    message: String,
}

async fn add_comment(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
    Json(body): Json<CommentRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::CommentCreate)
        .api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    let comment_id = CommentId::new();
    services
        .dispatch_ticket(
            member.company_id,
            ticket_id,
            TicketCommand::AddComment(AddComment {
                company_id: member.company_id,
                ticket_id,
                comment_id,
                message: body.message,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok((StatusCode::CREATED, Json(json!({ "comment_id": comment_id }))).into_response())
}

/// Edit a comment. Ownership binds every role: only the sender may edit,
/// admins included.
async fn edit_comment(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path((ticket_id, comment_id)): Path<(String, String)>,
    Json(body): Json<CommentRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::CommentEditOwn)
        .api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    let comment_id = comment_id.parse::<CommentId>().api()?;

    let sender = services
        .tickets()
        .comment_sender(member.company_id, &ticket_id, comment_id);
    own_comment(&member, sender).into_result().api()?;

    let committed = services
        .dispatch_ticket(
            member.company_id,
            ticket_id,
            TicketCommand::EditComment(EditComment {
                company_id: member.company_id,
                ticket_id,
                comment_id,
                message: body.message,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

async fn delete_comment(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path((ticket_id, comment_id)): Path<(String, String)>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::CommentDeleteOwn)
        .api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    let comment_id = comment_id.parse::<CommentId>().api()?;

    let sender = services
        .tickets()
        .comment_sender(member.company_id, &ticket_id, comment_id);
    own_comment(&member, sender).into_result().api()?;

    services
        .dispatch_ticket(
            member.company_id,
            ticket_id,
            TicketCommand::DeleteComment(DeleteComment {
                company_id: member.company_id,
                ticket_id,
                comment_id,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// The append-only audit trail for a ticket, oldest first.
async fn list_history(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(ticket_id): Path<String>,
) -> Result<Response, Response> {
    let member = services.pipeline().member(principal.principal_id).api()?;
    let ticket_id = parse_ticket_id(&ticket_id).api()?;
    scoped_ticket(&services, &member, &ticket_id).api()?;

    let history = services
        .tickets()
        .history(member.company_id, &ticket_id)
        .ok_or(DomainError::NotFound)
        .api()?;
    Ok(Json(history).into_response())
}
