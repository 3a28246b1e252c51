//! Bearer authentication middleware.
//!
//! The first pipeline stage: verify the token and inject a
//! [`PrincipalContext`]. Anything after this layer can assume an
//! authenticated principal; a missing or invalid token never reaches a
//! handler.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use bugtrail_auth::Hs256TokenCodec;

use crate::app::errors::json_error;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub codec: Arc<Hs256TokenCodec>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(&request) else {
        return unauthenticated();
    };

    let claims = match state.codec.verify(token) {
        Ok(claims) => claims,
        Err(err) => {
            tracing::debug!(error = %err, "rejected bearer token");
            return unauthenticated();
        }
    };

    request.extensions_mut().insert(PrincipalContext {
        principal_id: claims.sub,
        email: claims.email,
    });

    next.run(request).await
}

fn extract_bearer(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unauthenticated() -> Response {
    json_error(
        StatusCode::UNAUTHORIZED,
        "unauthenticated",
        "missing or invalid bearer token",
    )
}
