//! Route table.

pub mod companies;
pub mod projects;
pub mod system;
pub mod tickets;

use axum::Router;

/// All authenticated routes.
pub fn router() -> Router {
    Router::new()
        .merge(system::router())
        .merge(companies::router())
        .merge(projects::router())
        .merge(tickets::router())
}
