//! Read-model projections fed by the event bus.
//!
//! Projections are disposable: they can be rebuilt at any time by replaying
//! the event store. Consumers must be idempotent (at-least-once delivery).

pub mod memberships;
pub mod projects;
pub mod tickets;

/// Aggregate type identifiers used as stream discriminators.
pub const COMPANY_AGGREGATE_TYPE: &str = "company";
pub const PROJECT_AGGREGATE_TYPE: &str = "project";
pub const TICKET_AGGREGATE_TYPE: &str = "ticket";

pub use memberships::{CompanyDetails, MemberReadModel, MembershipsProjection};
pub use projects::{ProjectReadModel, ProjectsProjection};
pub use tickets::{TicketOwnership, TicketReadModel, TicketsProjection};
