//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// This is the full decision taxonomy of the authorization/lifecycle layer.
/// Each guard stage fails fast with exactly one of these variants; the HTTP
/// layer maps them to status codes in one place.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The resource, or its ownership chain, does not resolve.
    #[error("not found")]
    NotFound,

    /// No valid session / principal on the request.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The principal has no active company membership.
    #[error("no company membership")]
    NoMembership,

    /// A role or scope check denied the operation.
    #[error("forbidden")]
    Forbidden,

    /// The lifecycle guard blocked the operation (archived resource).
    #[error("operation not allowed on archived resource: {0}")]
    InvalidState(String),

    /// A conflict occurred (e.g. duplicate registration, stale version).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
