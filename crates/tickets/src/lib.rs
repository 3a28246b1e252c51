//! `bugtrail-tickets` — ticket aggregate, comments, and the audit history
//! derived from the ticket event stream.

pub mod history;
pub mod ticket;

pub use history::{history_entry, TicketHistoryEntry, TicketHistoryKind};
pub use ticket::{
    AddComment, AssignDeveloper, ChangeKind, ChangePriority, ChangeStatus, Comment, CommentAdded,
    CommentDeleted, CommentEdited, DeleteComment, DeleteTicket, DeveloperAssigned, EditComment,
    KindChanged, OpenTicket, PriorityChanged, StatusChanged, Ticket, TicketArchived,
    TicketCommand, TicketDeleted, TicketEvent, TicketId, TicketKind, TicketOpened,
    TicketPriority, TicketStatus, TicketUnarchived, UnarchiveTicket, UpdateTicketDetails,
    ArchiveTicket, TicketDetailsUpdated,
};
