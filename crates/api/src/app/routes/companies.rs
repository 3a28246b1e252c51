//! Company registration, details, and roster management.
//!
//! The caller's seat determines the company every route operates on, so no
//! route takes a company id. Registration is the one operation open to
//! principals without a seat.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use bugtrail_auth::{Action, Role};
use bugtrail_company::{
    ChangeMemberRole, CompanyCommand, DeleteCompany, InviteMember, RegisterCompany, RemoveMember,
    UpdateCompanyDetails,
};
use bugtrail_core::{CompanyId, DomainError, MemberId};

use crate::app::errors::{domain_error_response, IntoApiResult};
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/companies", post(register_company))
        .route(
            "/company",
            get(get_company).patch(update_company).delete(delete_company),
        )
        .route("/company/members", get(list_members).post(invite_member))
        .route(
            "/company/members/:member_id",
            axum::routing::patch(change_member_role).delete(remove_member),
        )
}

#[derive(Debug, Deserialize)]
struct RegisterCompanyRequest {
    name: String,
    #[serde(default)]
    description: String,
}

/// Register a company; the caller becomes its first Admin.
///
/// Membership is exclusive, so a principal who already holds a seat anywhere
/// gets a conflict instead of a second company.
async fn register_company(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<RegisterCompanyRequest>,
) -> Result<Response, Response> {
    if services.pipeline().is_seated(principal.principal_id) {
        return Err(domain_error_response(&DomainError::conflict(
            "principal already belongs to a company",
        )));
    }

    let company_id = CompanyId::new();
    let member_id = MemberId::new();
    let committed = services
        .dispatch_company(
            company_id,
            CompanyCommand::Register(RegisterCompany {
                company_id,
                name: body.name,
                description: body.description,
                creator_member_id: member_id,
                creator_principal_id: principal.principal_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "company_id": company_id,
            "member_id": member_id,
            "events_committed": committed.len(),
        })),
    )
        .into_response())
}

async fn get_company(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, Response> {
    let member = services.pipeline().member(principal.principal_id).api()?;
    let details = services
        .memberships()
        .company(member.company_id)
        .ok_or(DomainError::NotFound)
        .api()?;
    Ok(Json(details).into_response())
}

#[derive(Debug, Deserialize)]
struct UpdateCompanyRequest {
    name: Option<String>,
    description: Option<String>,
}

async fn update_company(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<UpdateCompanyRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::CompanyEdit)
        .api()?;

    let committed = services
        .dispatch_company(
            member.company_id,
            CompanyCommand::UpdateDetails(UpdateCompanyDetails {
                company_id: member.company_id,
                name: body.name,
                description: body.description,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

async fn delete_company(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::CompanyDelete)
        .api()?;

    services
        .dispatch_company(
            member.company_id,
            CompanyCommand::Delete(DeleteCompany {
                company_id: member.company_id,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn list_members(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, Response> {
    let member = services.pipeline().member(principal.principal_id).api()?;
    Ok(Json(services.memberships().members(member.company_id)).into_response())
}

#[derive(Debug, Deserialize)]
struct InviteMemberRequest {
    principal_id: bugtrail_auth::PrincipalId,
    role: Role,
}

/// Seat a principal in the caller's company.
///
/// Rejected with a conflict when the target principal already holds a seat
/// in any company, including this one.
async fn invite_member(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<InviteMemberRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::CompanyInviteMember)
        .api()?;

    if services.pipeline().is_seated(body.principal_id) {
        return Err(domain_error_response(&DomainError::conflict(
            "principal already belongs to a company",
        )));
    }

    let member_id = MemberId::new();
    services
        .dispatch_company(
            member.company_id,
            CompanyCommand::InviteMember(InviteMember {
                company_id: member.company_id,
                member_id,
                principal_id: body.principal_id,
                role: body.role,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok((StatusCode::CREATED, Json(json!({ "member_id": member_id }))).into_response())
}

#[derive(Debug, Deserialize)]
struct ChangeMemberRoleRequest {
    role: Role,
}

async fn change_member_role(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(member_id): Path<String>,
    Json(body): Json<ChangeMemberRoleRequest>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::CompanyChangeMemberRole)
        .api()?;
    let member_id = member_id.parse::<MemberId>().api()?;

    let committed = services
        .dispatch_company(
            member.company_id,
            CompanyCommand::ChangeMemberRole(ChangeMemberRole {
                company_id: member.company_id,
                member_id,
                role: body.role,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(Json(json!({ "changed": !committed.is_empty() })).into_response())
}

async fn remove_member(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
    Path(member_id): Path<String>,
) -> Result<Response, Response> {
    let member = services
        .pipeline()
        .authorize(principal.principal_id, Action::CompanyRemoveMember)
        .api()?;
    let member_id = member_id.parse::<MemberId>().api()?;

    services
        .dispatch_company(
            member.company_id,
            CompanyCommand::RemoveMember(RemoveMember {
                company_id: member.company_id,
                member_id,
                actor: member.member_id,
                occurred_at: Utc::now(),
            }),
        )
        .api()?;

    Ok(StatusCode::NO_CONTENT.into_response())
}
