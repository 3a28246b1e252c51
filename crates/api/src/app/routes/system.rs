//! Liveness and caller identity.

use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;

use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new().route("/whoami", get(whoami))
}

pub async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

/// The caller's identity plus their current seat, resolved live.
async fn whoami(
    Extension(services): Extension<AppServices>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    let membership = services
        .pipeline()
        .member(principal.principal_id)
        .ok()
        .map(|m| {
            json!({
                "company_id": m.company_id,
                "member_id": m.member_id,
                "role": m.role,
            })
        });

    Json(json!({
        "principal_id": principal.principal_id,
        "email": principal.email,
        "membership": membership,
    }))
    .into_response()
}
