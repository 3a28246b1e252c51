//! Audit history derived from the ticket event stream.
//!
//! Each persisted [`TicketEvent`] maps to exactly one history entry, so the
//! audit trail is written atomically with the mutation it documents: both
//! are the same stored record. Entries are never mutated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bugtrail_core::{CommentId, MemberId};

use crate::ticket::TicketEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketHistoryKind {
    Opened,
    DetailsEdited,
    StatusChanged,
    KindChanged,
    PriorityChanged,
    AssigneeChanged,
    Archived,
    Unarchived,
    Deleted,
    CommentAdded,
    CommentEdited,
    CommentDeleted,
}

/// One immutable audit record for a ticket mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketHistoryEntry {
    pub kind: TicketHistoryKind,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub actor: MemberId,
    pub related_comment: Option<CommentId>,
    pub occurred_at: DateTime<Utc>,
}

/// Project a ticket event into its audit entry.
pub fn history_entry(event: &TicketEvent) -> TicketHistoryEntry {
    match event {
        TicketEvent::Opened(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::Opened,
            old_value: None,
            new_value: Some(e.title.clone()),
            actor: e.actor,
            related_comment: None,
            occurred_at: e.occurred_at,
        },
        TicketEvent::DetailsUpdated(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::DetailsEdited,
            old_value: e.old_priority.map(|p| p.as_str().to_string()),
            new_value: e
                .title
                .clone()
                .or_else(|| e.new_priority.map(|p| p.as_str().to_string())),
            actor: e.actor,
            related_comment: None,
            occurred_at: e.occurred_at,
        },
        TicketEvent::StatusChanged(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::StatusChanged,
            old_value: Some(e.old_status.as_str().to_string()),
            new_value: Some(e.new_status.as_str().to_string()),
            actor: e.actor,
            related_comment: None,
            occurred_at: e.occurred_at,
        },
        TicketEvent::KindChanged(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::KindChanged,
            old_value: Some(e.old_kind.as_str().to_string()),
            new_value: Some(e.new_kind.as_str().to_string()),
            actor: e.actor,
            related_comment: None,
            occurred_at: e.occurred_at,
        },
        TicketEvent::PriorityChanged(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::PriorityChanged,
            old_value: Some(e.old_priority.as_str().to_string()),
            new_value: Some(e.new_priority.as_str().to_string()),
            actor: e.actor,
            related_comment: None,
            occurred_at: e.occurred_at,
        },
        TicketEvent::DeveloperAssigned(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::AssigneeChanged,
            old_value: e.old_assignee_id.map(|m| m.to_string()),
            new_value: Some(e.new_assignee_id.to_string()),
            actor: e.actor,
            related_comment: None,
            occurred_at: e.occurred_at,
        },
        TicketEvent::Archived(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::Archived,
            old_value: Some("active".to_string()),
            new_value: Some("archived".to_string()),
            actor: e.actor,
            related_comment: None,
            occurred_at: e.occurred_at,
        },
        TicketEvent::Unarchived(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::Unarchived,
            old_value: Some("archived".to_string()),
            new_value: Some("active".to_string()),
            actor: e.actor,
            related_comment: None,
            occurred_at: e.occurred_at,
        },
        TicketEvent::Deleted(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::Deleted,
            old_value: None,
            new_value: None,
            actor: e.actor,
            related_comment: None,
            occurred_at: e.occurred_at,
        },
        TicketEvent::CommentAdded(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::CommentAdded,
            old_value: None,
            new_value: Some(e.message.clone()),
            actor: e.actor,
            related_comment: Some(e.comment_id),
            occurred_at: e.occurred_at,
        },
        TicketEvent::CommentEdited(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::CommentEdited,
            old_value: Some(e.old_message.clone()),
            new_value: Some(e.new_message.clone()),
            actor: e.actor,
            related_comment: Some(e.comment_id),
            occurred_at: e.occurred_at,
        },
        TicketEvent::CommentDeleted(e) => TicketHistoryEntry {
            kind: TicketHistoryKind::CommentDeleted,
            old_value: None,
            new_value: None,
            actor: e.actor,
            related_comment: Some(e.comment_id),
            occurred_at: e.occurred_at,
        },
    }
}
