//! Error-to-response mapping.
//!
//! One translation point for the whole surface. `Forbidden` and `NotFound`
//! deliberately share the same body, so probing a foreign resource returns a
//! payload identical to probing a nonexistent one.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use bugtrail_core::DomainError;
use bugtrail_infra::DispatchError;

pub fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message,
        })),
    )
        .into_response()
}

/// The shared body for both `Forbidden` and `NotFound`.
fn not_accessible(status: StatusCode) -> Response {
    json_error(status, "not_accessible", "resource not accessible")
}

pub fn domain_error_response(err: &DomainError) -> Response {
    match err {
        DomainError::Unauthenticated => json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "missing or invalid bearer token",
        ),
        DomainError::NoMembership => json_error(
            StatusCode::FORBIDDEN,
            "no_membership",
            "principal holds no company membership",
        ),
        DomainError::Forbidden => not_accessible(StatusCode::FORBIDDEN),
        DomainError::NotFound => not_accessible(StatusCode::NOT_FOUND),
        DomainError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvalidState(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_state", msg)
        }
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn dispatch_error_response(err: DispatchError) -> Response {
    match err {
        DispatchError::Domain(domain) => domain_error_response(&domain),
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", &msg),
        DispatchError::CompanyIsolation(_)
        | DispatchError::Deserialize(_)
        | DispatchError::Store(_)
        | DispatchError::Publish(_) => {
            tracing::error!(error = ?err, "dispatch failed");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "internal error",
            )
        }
    }
}

/// Lift fallible pipeline/dispatch results into handler short-circuits, so
/// handlers can `?` their way through the stages.
pub trait IntoApiResult<T> {
    fn api(self) -> Result<T, Response>;
}

impl<T> IntoApiResult<T> for Result<T, DomainError> {
    fn api(self) -> Result<T, Response> {
        self.map_err(|err| domain_error_response(&err))
    }
}

impl<T> IntoApiResult<T> for Result<T, DispatchError> {
    fn api(self) -> Result<T, Response> {
        self.map_err(dispatch_error_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_and_not_found_status_mapping() {
        let forbid = domain_error_response(&DomainError::Forbidden);
        let missing = domain_error_response(&DomainError::NotFound);
        assert_eq!(forbid.status(), StatusCode::FORBIDDEN);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
