//! `bugtrail-api` — HTTP surface over the issue tracker.
//!
//! Every mutating request travels the same pipeline: bearer authentication,
//! membership resolution, role catalog check, ownership scope check, archival
//! lifecycle check, then command dispatch. The stages are fixed in that order
//! and each failure short-circuits the rest.

pub mod app;
pub mod context;
pub mod middleware;
pub mod pipeline;
