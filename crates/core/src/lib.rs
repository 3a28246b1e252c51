//! `bugtrail-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the shared error taxonomy, aggregate traits,
//! and the archival lifecycle guard.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod lifecycle;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, CommentId, CompanyId, MemberId};
pub use lifecycle::{check_mutation, ArchiveState, MutationKind};
