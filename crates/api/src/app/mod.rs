//! Application assembly: router, middleware stack, service graph.

pub mod errors;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::routing::get;
use axum::{middleware as axum_middleware, Extension, Router};

use bugtrail_auth::Hs256TokenCodec;

use crate::middleware::{auth_middleware, AuthState};

/// Build the full application router.
///
/// `/health` is the only unauthenticated route; everything else sits behind
/// the bearer middleware and the shared services extension.
pub async fn build_app(jwt_secret: &[u8]) -> anyhow::Result<Router> {
    let services = services::build_services()?;
    let auth_state = AuthState {
        codec: Arc::new(Hs256TokenCodec::new(jwt_secret)),
    };

    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected))
}
