//! Per-request contexts injected by the middleware stack.

use bugtrail_auth::PrincipalId;

/// The authenticated caller, as established from the bearer token.
///
/// Carries identity only. Membership, company and role are resolved fresh on
/// every request through the membership projection, never from the token.
#[derive(Debug, Clone)]
pub struct PrincipalContext {
    pub principal_id: PrincipalId,
    pub email: String,
}
