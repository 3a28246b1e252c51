//! End-to-end dispatcher tests over the in-memory store and bus, including
//! the fault-injection check that a failed append leaves ticket state and its
//! audit history untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use bugtrail_core::{AggregateId, CompanyId, ExpectedVersion, MemberId};
use bugtrail_events::{EventBus, EventEnvelope, InMemoryEventBus};
use bugtrail_infra::projections::{TicketsProjection, TICKET_AGGREGATE_TYPE};
use bugtrail_infra::read_model::InMemoryCompanyStore;
use bugtrail_infra::{
    CommandDispatcher, DispatchError, EventStore, EventStoreError, InMemoryEventStore,
    StoredEvent, UncommittedEvent,
};
use bugtrail_projects::ProjectId;
use bugtrail_tickets::{
    ArchiveTicket, ChangeStatus, OpenTicket, Ticket, TicketCommand, TicketId, TicketKind,
    TicketPriority, TicketStatus,
};

type Bus = InMemoryEventBus<EventEnvelope<JsonValue>>;

/// Store wrapper that fails appends on demand.
struct FaultyStore {
    inner: InMemoryEventStore,
    fail_appends: AtomicBool,
}

impl FaultyStore {
    fn new() -> Self {
        Self {
            inner: InMemoryEventStore::new(),
            fail_appends: AtomicBool::new(false),
        }
    }

    fn fail_next_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }
}

impl EventStore for FaultyStore {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(EventStoreError::InvalidAppend(
                "injected append failure".to_string(),
            ));
        }
        self.inner.append(events, expected_version)
    }

    fn load_stream(
        &self,
        company_id: CompanyId,
        aggregate_id: AggregateId,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.inner.load_stream(company_id, aggregate_id)
    }
}

fn open_cmd(
    company_id: CompanyId,
    ticket_id: TicketId,
    submitter: MemberId,
) -> TicketCommand {
    TicketCommand::Open(OpenTicket {
        company_id,
        project_id: ProjectId::new(AggregateId::new()),
        ticket_id,
        title: "Search index stale".to_string(),
        description: "Results lag by hours".to_string(),
        kind: TicketKind::Defect,
        priority: TicketPriority::High,
        submitter_id: submitter,
        actor: submitter,
        occurred_at: Utc::now(),
    })
}

#[test]
fn dispatch_persists_publishes_and_feeds_projections() {
    let store = Arc::new(InMemoryEventStore::new());
    let bus = Arc::new(Bus::new());
    let subscription = bus.subscribe();
    let dispatcher = CommandDispatcher::new(Arc::clone(&store), Arc::clone(&bus));

    let projection = TicketsProjection::new(Arc::new(InMemoryCompanyStore::new()));

    let company_id = CompanyId::new();
    let ticket_id = TicketId::new(AggregateId::new());
    let submitter = MemberId::new();

    let committed = dispatcher
        .dispatch::<Ticket>(
            company_id,
            ticket_id.0,
            TICKET_AGGREGATE_TYPE,
            open_cmd(company_id, ticket_id, submitter),
            |_, id| Ticket::empty(TicketId::new(id)),
        )
        .unwrap();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].sequence_number, 1);

    let committed = dispatcher
        .dispatch::<Ticket>(
            company_id,
            ticket_id.0,
            TICKET_AGGREGATE_TYPE,
            TicketCommand::ChangeStatus(ChangeStatus {
                company_id,
                ticket_id,
                status: TicketStatus::InDevelopment,
                actor: submitter,
                occurred_at: Utc::now(),
            }),
            |_, id| Ticket::empty(TicketId::new(id)),
        )
        .unwrap();
    assert_eq!(committed[0].sequence_number, 2);

    // Feed the projection from the bus, as the API wiring does.
    while let Ok(envelope) = subscription.try_recv() {
        projection.apply_envelope(&envelope).unwrap();
    }

    let model = projection.get(company_id, &ticket_id).unwrap();
    assert_eq!(model.status, TicketStatus::InDevelopment);
    assert_eq!(model.history.len(), 2);
}

#[test]
fn no_op_command_appends_and_publishes_nothing() {
    let store = Arc::new(InMemoryEventStore::new());
    let bus = Arc::new(Bus::new());
    let subscription = bus.subscribe();
    let dispatcher = CommandDispatcher::new(Arc::clone(&store), Arc::clone(&bus));

    let company_id = CompanyId::new();
    let ticket_id = TicketId::new(AggregateId::new());
    let submitter = MemberId::new();

    dispatcher
        .dispatch::<Ticket>(
            company_id,
            ticket_id.0,
            TICKET_AGGREGATE_TYPE,
            open_cmd(company_id, ticket_id, submitter),
            |_, id| Ticket::empty(TicketId::new(id)),
        )
        .unwrap();

    let archive = |dispatcher: &CommandDispatcher<Arc<InMemoryEventStore>, Arc<Bus>>| {
        dispatcher.dispatch::<Ticket>(
            company_id,
            ticket_id.0,
            TICKET_AGGREGATE_TYPE,
            TicketCommand::Archive(ArchiveTicket {
                company_id,
                ticket_id,
                actor: submitter,
                occurred_at: Utc::now(),
            }),
            |_, id| Ticket::empty(TicketId::new(id)),
        )
    };

    assert_eq!(archive(&dispatcher).unwrap().len(), 1);
    // Second archive is a valid no-op: nothing committed, changed=false.
    assert!(archive(&dispatcher).unwrap().is_empty());

    let mut published = 0;
    while subscription.try_recv().is_ok() {
        published += 1;
    }
    assert_eq!(published, 2);
    assert_eq!(store.load_stream(company_id, ticket_id.0).unwrap().len(), 2);
}

#[test]
fn failed_append_rolls_back_mutation_and_history() {
    let store = Arc::new(FaultyStore::new());
    let bus = Arc::new(Bus::new());
    let subscription = bus.subscribe();
    let dispatcher = CommandDispatcher::new(Arc::clone(&store), Arc::clone(&bus));

    let projection = TicketsProjection::new(Arc::new(InMemoryCompanyStore::new()));

    let company_id = CompanyId::new();
    let ticket_id = TicketId::new(AggregateId::new());
    let submitter = MemberId::new();

    dispatcher
        .dispatch::<Ticket>(
            company_id,
            ticket_id.0,
            TICKET_AGGREGATE_TYPE,
            open_cmd(company_id, ticket_id, submitter),
            |_, id| Ticket::empty(TicketId::new(id)),
        )
        .unwrap();

    store.fail_next_appends(true);
    let result = dispatcher.dispatch::<Ticket>(
        company_id,
        ticket_id.0,
        TICKET_AGGREGATE_TYPE,
        TicketCommand::ChangeStatus(ChangeStatus {
            company_id,
            ticket_id,
            status: TicketStatus::Resolved,
            actor: submitter,
            occurred_at: Utc::now(),
        }),
        |_, id| Ticket::empty(TicketId::new(id)),
    );
    assert!(matches!(result, Err(DispatchError::Store(_))));
    store.fail_next_appends(false);

    // The stream holds only the open event; nothing was published for the
    // failed mutation.
    let stream = store.load_stream(company_id, ticket_id.0).unwrap();
    assert_eq!(stream.len(), 1);

    while let Ok(envelope) = subscription.try_recv() {
        projection.apply_envelope(&envelope).unwrap();
    }
    let model = projection.get(company_id, &ticket_id).unwrap();
    assert_eq!(model.status, TicketStatus::New);
    assert_eq!(model.history.len(), 1);
}
