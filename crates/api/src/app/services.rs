//! Service wiring: store, bus, dispatcher, projections, pipeline.
//!
//! Everything runs in-process: the dispatcher appends to the in-memory event
//! store and publishes to the in-memory bus; a background task drains the bus
//! into the projections. Consumers are idempotent, so at-least-once delivery
//! from the bus is safe.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use bugtrail_auth::{Action, RoleCatalog, TicketScope};
use bugtrail_company::Company;
use bugtrail_core::{CompanyId, DomainError, MemberId};
use bugtrail_events::{EventBus, EventEnvelope, InMemoryEventBus};
use bugtrail_infra::projections::{
    MemberReadModel, MembershipsProjection, ProjectReadModel, ProjectsProjection, TicketReadModel,
    TicketsProjection, COMPANY_AGGREGATE_TYPE, PROJECT_AGGREGATE_TYPE, TICKET_AGGREGATE_TYPE,
};
use bugtrail_infra::{
    CommandDispatcher, DispatchError, InMemoryCompanyStore, InMemoryEventStore, StoredEvent,
};
use bugtrail_projects::{Project, ProjectCommand, ProjectId};
use bugtrail_tickets::{Ticket, TicketCommand, TicketId};

use crate::pipeline::RequestPipeline;

type Envelope = EventEnvelope<JsonValue>;
type Store = Arc<InMemoryEventStore>;
type Bus = Arc<InMemoryEventBus<Envelope>>;

pub type Memberships =
    Arc<MembershipsProjection<Arc<InMemoryCompanyStore<MemberId, MemberReadModel>>>>;
pub type Projects = Arc<ProjectsProjection<Arc<InMemoryCompanyStore<ProjectId, ProjectReadModel>>>>;
pub type Tickets = Arc<TicketsProjection<Arc<InMemoryCompanyStore<TicketId, TicketReadModel>>>>;

/// Shared application services, injected into handlers as an extension.
#[derive(Clone)]
pub struct AppServices {
    dispatcher: Arc<CommandDispatcher<Store, Bus>>,
    pipeline: Arc<RequestPipeline<Memberships>>,
    memberships: Memberships,
    projects: Projects,
    tickets: Tickets,
}

/// Build the in-memory service graph and start the bus consumer.
///
/// Fails when the standard role catalog does not cover every gated action;
/// that is a deployment error and the process must not serve requests.
pub fn build_services() -> anyhow::Result<AppServices> {
    let catalog = RoleCatalog::standard();
    catalog.validate_coverage(&Action::ALL)?;

    let store: Store = Arc::new(InMemoryEventStore::new());
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let dispatcher = Arc::new(CommandDispatcher::new(Arc::clone(&store), Arc::clone(&bus)));

    let memberships: Memberships =
        Arc::new(MembershipsProjection::new(Arc::new(InMemoryCompanyStore::new())));
    let projects: Projects =
        Arc::new(ProjectsProjection::new(Arc::new(InMemoryCompanyStore::new())));
    let tickets: Tickets =
        Arc::new(TicketsProjection::new(Arc::new(InMemoryCompanyStore::new())));

    spawn_bus_consumer(
        &bus,
        Arc::clone(&memberships),
        Arc::clone(&projects),
        Arc::clone(&tickets),
    );

    let pipeline = Arc::new(RequestPipeline::new(catalog, Arc::clone(&memberships)));

    Ok(AppServices {
        dispatcher,
        pipeline,
        memberships,
        projects,
        tickets,
    })
}

fn spawn_bus_consumer(bus: &Bus, memberships: Memberships, projects: Projects, tickets: Tickets) {
    let subscription = bus.subscribe();
    tokio::task::spawn_blocking(move || {
        loop {
            let envelope = match subscription.recv() {
                Ok(envelope) => envelope,
                // Bus dropped: process shutdown.
                Err(_) => break,
            };

            let result = match envelope.aggregate_type() {
                COMPANY_AGGREGATE_TYPE => memberships.apply_envelope(&envelope),
                PROJECT_AGGREGATE_TYPE => projects.apply_envelope(&envelope),
                TICKET_AGGREGATE_TYPE => tickets.apply_envelope(&envelope),
                other => {
                    tracing::warn!(aggregate_type = other, "unrecognized aggregate type on bus");
                    Ok(())
                }
            };
            if let Err(err) = result {
                tracing::error!(
                    error = %err,
                    event_id = %envelope.event_id(),
                    aggregate_id = %envelope.aggregate_id(),
                    "projection failed to apply event"
                );
            }
        }
    });
}

impl AppServices {
    pub fn pipeline(&self) -> &RequestPipeline<Memberships> {
        &self.pipeline
    }

    pub fn memberships(&self) -> &Memberships {
        &self.memberships
    }

    pub fn projects(&self) -> &Projects {
        &self.projects
    }

    pub fn tickets(&self) -> &Tickets {
        &self.tickets
    }

    pub fn dispatch_company(
        &self,
        company_id: CompanyId,
        command: bugtrail_company::CompanyCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher.dispatch::<Company>(
            company_id,
            company_id.into(),
            COMPANY_AGGREGATE_TYPE,
            command,
            |_, id| Company::empty(CompanyId::from(id)),
        )
    }

    pub fn dispatch_project(
        &self,
        company_id: CompanyId,
        project_id: ProjectId,
        command: ProjectCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher.dispatch::<Project>(
            company_id,
            project_id.0,
            PROJECT_AGGREGATE_TYPE,
            command,
            |_, id| Project::empty(ProjectId::new(id)),
        )
    }

    pub fn dispatch_ticket(
        &self,
        company_id: CompanyId,
        ticket_id: TicketId,
        command: TicketCommand,
    ) -> Result<Vec<StoredEvent>, DispatchError> {
        self.dispatcher.dispatch::<Ticket>(
            company_id,
            ticket_id.0,
            TICKET_AGGREGATE_TYPE,
            command,
            |_, id| Ticket::empty(TicketId::new(id)),
        )
    }

    /// Assemble the full ownership chain for a ticket scope decision.
    ///
    /// `None` means the ticket itself does not resolve; a ticket whose
    /// project no longer resolves yields `project: None`, which the scope
    /// guard reports as an unresolvable chain.
    pub fn ticket_scope_snapshot(
        &self,
        company_id: CompanyId,
        ticket_id: &TicketId,
    ) -> Option<TicketScope> {
        let ownership = self.tickets.ownership(company_id, ticket_id)?;
        Some(TicketScope {
            project: self.projects.scope(company_id, &ownership.project_id),
            submitter_id: ownership.submitter_id,
            assignee_id: ownership.assignee_id,
        })
    }

    /// Look up a roster seat, for validating member references in requests.
    pub fn roster_seat(
        &self,
        company_id: CompanyId,
        member_id: MemberId,
    ) -> Result<MemberReadModel, DomainError> {
        self.memberships
            .member(company_id, &member_id)
            .ok_or_else(|| DomainError::validation("member is not part of this company"))
    }
}
