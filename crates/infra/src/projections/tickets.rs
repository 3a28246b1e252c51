//! Tickets projection: per-company ticket directory, comments, and the
//! append-only audit history rendered from the same events that mutate the
//! ticket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bugtrail_core::{CommentId, CompanyId, MemberId};
use bugtrail_events::EventEnvelope;
use bugtrail_projects::ProjectId;
use bugtrail_tickets::{
    history_entry, Comment, TicketEvent, TicketHistoryEntry, TicketId, TicketKind, TicketOpened,
    TicketPriority, TicketStatus,
};

use super::TICKET_AGGREGATE_TYPE;
use crate::read_model::CompanyStore;

/// Ticket read model for queries, scope resolution, and audit listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketReadModel {
    pub ticket_id: TicketId,
    pub project_id: ProjectId,
    pub company_id: CompanyId,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub kind: TicketKind,
    pub priority: TicketPriority,
    pub submitter_id: MemberId,
    pub assignee_id: Option<MemberId>,
    pub archived: bool,
    pub comments: Vec<Comment>,
    pub history: Vec<TicketHistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The part of a ticket's ownership chain the scope guard needs; the project
/// half of the chain is resolved separately so an orphaned project reference
/// surfaces as an unresolvable chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketOwnership {
    pub project_id: ProjectId,
    pub submitter_id: MemberId,
    pub assignee_id: Option<MemberId>,
}

pub struct TicketsProjection<S> {
    store: S,
}

impl<S> TicketsProjection<S>
where
    S: CompanyStore<TicketId, TicketReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != TICKET_AGGREGATE_TYPE {
            return Ok(());
        }

        let event: TicketEvent = serde_json::from_value(envelope.payload().clone())?;
        match &event {
            TicketEvent::Opened(e) => self.apply_opened(e, &event),
            TicketEvent::Deleted(e) => {
                self.store.remove(e.company_id, &e.ticket_id);
            }
            _ => self.apply_mutation(&event),
        }
        Ok(())
    }

    fn apply_opened(&self, e: &TicketOpened, event: &TicketEvent) {
        self.store.upsert(
            e.company_id,
            e.ticket_id,
            TicketReadModel {
                ticket_id: e.ticket_id,
                project_id: e.project_id,
                company_id: e.company_id,
                title: e.title.clone(),
                description: e.description.clone(),
                status: TicketStatus::New,
                kind: e.kind,
                priority: e.priority,
                submitter_id: e.submitter_id,
                assignee_id: None,
                archived: false,
                comments: Vec::new(),
                history: vec![history_entry(event)],
                created_at: e.occurred_at,
                updated_at: e.occurred_at,
            },
        );
    }

    fn apply_mutation(&self, event: &TicketEvent) {
        let (company_id, ticket_id) = match event {
            TicketEvent::DetailsUpdated(e) => (e.company_id, e.ticket_id),
            TicketEvent::StatusChanged(e) => (e.company_id, e.ticket_id),
            TicketEvent::KindChanged(e) => (e.company_id, e.ticket_id),
            TicketEvent::PriorityChanged(e) => (e.company_id, e.ticket_id),
            TicketEvent::DeveloperAssigned(e) => (e.company_id, e.ticket_id),
            TicketEvent::Archived(e) => (e.company_id, e.ticket_id),
            TicketEvent::Unarchived(e) => (e.company_id, e.ticket_id),
            TicketEvent::CommentAdded(e) => (e.company_id, e.ticket_id),
            TicketEvent::CommentEdited(e) => (e.company_id, e.ticket_id),
            TicketEvent::CommentDeleted(e) => (e.company_id, e.ticket_id),
            TicketEvent::Opened(_) | TicketEvent::Deleted(_) => return,
        };

        let Some(mut model) = self.store.get(company_id, &ticket_id) else {
            return;
        };

        match event {
            TicketEvent::DetailsUpdated(e) => {
                if let Some(title) = &e.title {
                    model.title = title.clone();
                }
                if let Some(description) = &e.description {
                    model.description = description.clone();
                }
                if let Some(priority) = e.new_priority {
                    model.priority = priority;
                }
                model.updated_at = e.occurred_at;
            }
            TicketEvent::StatusChanged(e) => {
                model.status = e.new_status;
                model.updated_at = e.occurred_at;
            }
            TicketEvent::KindChanged(e) => {
                model.kind = e.new_kind;
                model.updated_at = e.occurred_at;
            }
            TicketEvent::PriorityChanged(e) => {
                model.priority = e.new_priority;
                model.updated_at = e.occurred_at;
            }
            TicketEvent::DeveloperAssigned(e) => {
                model.assignee_id = Some(e.new_assignee_id);
                model.updated_at = e.occurred_at;
            }
            TicketEvent::Archived(e) => {
                model.archived = true;
                model.updated_at = e.occurred_at;
            }
            TicketEvent::Unarchived(e) => {
                model.archived = false;
                model.updated_at = e.occurred_at;
            }
            TicketEvent::CommentAdded(e) => {
                model.comments.push(Comment {
                    comment_id: e.comment_id,
                    sender_id: e.sender_id,
                    message: e.message.clone(),
                    created_at: e.occurred_at,
                    updated_at: None,
                });
                model.updated_at = e.occurred_at;
            }
            TicketEvent::CommentEdited(e) => {
                if let Some(comment) = model
                    .comments
                    .iter_mut()
                    .find(|c| c.comment_id == e.comment_id)
                {
                    comment.message = e.new_message.clone();
                    comment.updated_at = Some(e.occurred_at);
                }
                model.updated_at = e.occurred_at;
            }
            TicketEvent::CommentDeleted(e) => {
                model.comments.retain(|c| c.comment_id != e.comment_id);
                model.updated_at = e.occurred_at;
            }
            TicketEvent::Opened(_) | TicketEvent::Deleted(_) => unreachable!(),
        }

        // Append-only audit: one entry per mutation, same record as the
        // state change above.
        model.history.push(history_entry(event));
        self.store.upsert(company_id, ticket_id, model);
    }

    pub fn get(&self, company_id: CompanyId, ticket_id: &TicketId) -> Option<TicketReadModel> {
        self.store.get(company_id, ticket_id)
    }

    /// List a company's tickets, optionally narrowed to a project and/or an
    /// archived state.
    pub fn list(
        &self,
        company_id: CompanyId,
        project_id: Option<ProjectId>,
        archived: Option<bool>,
    ) -> Vec<TicketReadModel> {
        let mut tickets: Vec<_> = self
            .store
            .list(company_id)
            .into_iter()
            .filter(|t| project_id.is_none_or(|p| t.project_id == p))
            .filter(|t| archived.is_none_or(|a| t.archived == a))
            .collect();
        tickets.sort_by_key(|t| t.created_at);
        tickets
    }

    /// The ticket half of the ownership chain. `None` means the ticket does
    /// not resolve within this company.
    pub fn ownership(&self, company_id: CompanyId, ticket_id: &TicketId) -> Option<TicketOwnership> {
        self.store.get(company_id, ticket_id).map(|t| TicketOwnership {
            project_id: t.project_id,
            submitter_id: t.submitter_id,
            assignee_id: t.assignee_id,
        })
    }

    /// Who sent a comment, for own-comment scope checks.
    pub fn comment_sender(
        &self,
        company_id: CompanyId,
        ticket_id: &TicketId,
        comment_id: CommentId,
    ) -> Option<MemberId> {
        let ticket = self.store.get(company_id, ticket_id)?;
        ticket
            .comments
            .iter()
            .find(|c| c.comment_id == comment_id)
            .map(|c| c.sender_id)
    }

    pub fn comments(&self, company_id: CompanyId, ticket_id: &TicketId) -> Option<Vec<Comment>> {
        self.store.get(company_id, ticket_id).map(|t| t.comments)
    }

    pub fn history(
        &self,
        company_id: CompanyId,
        ticket_id: &TicketId,
    ) -> Option<Vec<TicketHistoryEntry>> {
        self.store.get(company_id, ticket_id).map(|t| t.history)
    }
}
