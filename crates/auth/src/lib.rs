//! `bugtrail-auth` — pure authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. Every
//! decision here is a pure function of (member, resource snapshot, action):
//! the role catalog, the ownership scope guard, and membership resolution
//! all return tagged results the caller cannot accidentally ignore.

pub mod action;
pub mod catalog;
pub mod claims;
pub mod membership;
pub mod roles;
pub mod scope;

pub use action::{Action, ResourceKind};
pub use catalog::{CatalogError, RoleCatalog};
pub use claims::{Hs256TokenCodec, JwtClaims, TokenError};
pub use membership::{CompanyMember, MembershipResolver, PrincipalId};
pub use roles::Role;
pub use scope::{own_comment, project_scope, ticket_scope, ProjectScope, ScopeVerdict, TicketScope};
