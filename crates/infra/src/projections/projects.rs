//! Projects projection: per-company project directory and the ownership
//! snapshots consumed by scope checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bugtrail_auth::ProjectScope;
use bugtrail_core::{CompanyId, MemberId};
use bugtrail_events::EventEnvelope;
use bugtrail_projects::{
    ManagerAssigned, MemberAssigned, MemberUnassigned, ProjectArchived, ProjectCreated,
    ProjectDeleted, ProjectDetailsUpdated, ProjectEvent, ProjectId, ProjectPriority,
    ProjectUnarchived,
};

use super::PROJECT_AGGREGATE_TYPE;
use crate::read_model::CompanyStore;

/// Project read model for queries and scope resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectReadModel {
    pub project_id: ProjectId,
    pub company_id: CompanyId,
    pub name: String,
    pub description: String,
    pub manager_id: Option<MemberId>,
    pub assigned_members: Vec<MemberId>,
    pub archived: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: ProjectPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct ProjectsProjection<S> {
    store: S,
}

impl<S> ProjectsProjection<S>
where
    S: CompanyStore<ProjectId, ProjectReadModel>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
    ) -> Result<(), anyhow::Error> {
        if envelope.aggregate_type() != PROJECT_AGGREGATE_TYPE {
            return Ok(());
        }

        let event: ProjectEvent = serde_json::from_value(envelope.payload().clone())?;
        match event {
            ProjectEvent::Created(e) => self.apply_created(e),
            ProjectEvent::DetailsUpdated(e) => self.apply_details_updated(e),
            ProjectEvent::ManagerAssigned(e) => self.apply_manager_assigned(e),
            ProjectEvent::MemberAssigned(e) => self.apply_member_assigned(e),
            ProjectEvent::MemberUnassigned(e) => self.apply_member_unassigned(e),
            ProjectEvent::Archived(e) => self.apply_archived(e),
            ProjectEvent::Unarchived(e) => self.apply_unarchived(e),
            ProjectEvent::Deleted(e) => self.apply_deleted(e),
        }
        Ok(())
    }

    fn apply_created(&self, e: ProjectCreated) {
        self.store.upsert(
            e.company_id,
            e.project_id,
            ProjectReadModel {
                project_id: e.project_id,
                company_id: e.company_id,
                name: e.name,
                description: e.description,
                manager_id: None,
                assigned_members: Vec::new(),
                archived: false,
                due_date: e.due_date,
                priority: e.priority,
                created_at: e.occurred_at,
                updated_at: e.occurred_at,
            },
        );
    }

    fn apply_details_updated(&self, e: ProjectDetailsUpdated) {
        self.update(e.company_id, e.project_id, e.occurred_at, |m| {
            if let Some(name) = e.name.clone() {
                m.name = name;
            }
            if let Some(description) = e.description.clone() {
                m.description = description;
            }
            if let Some(due_date) = e.due_date {
                m.due_date = Some(due_date);
            }
            if let Some(priority) = e.priority {
                m.priority = priority;
            }
        });
    }

    fn apply_manager_assigned(&self, e: ManagerAssigned) {
        self.update(e.company_id, e.project_id, e.occurred_at, |m| {
            m.manager_id = Some(e.new_manager_id);
        });
    }

    fn apply_member_assigned(&self, e: MemberAssigned) {
        self.update(e.company_id, e.project_id, e.occurred_at, |m| {
            if !m.assigned_members.contains(&e.member_id) {
                m.assigned_members.push(e.member_id);
            }
        });
    }

    fn apply_member_unassigned(&self, e: MemberUnassigned) {
        self.update(e.company_id, e.project_id, e.occurred_at, |m| {
            m.assigned_members.retain(|id| *id != e.member_id);
        });
    }

    fn apply_archived(&self, e: ProjectArchived) {
        self.update(e.company_id, e.project_id, e.occurred_at, |m| {
            m.archived = true;
        });
    }

    fn apply_unarchived(&self, e: ProjectUnarchived) {
        self.update(e.company_id, e.project_id, e.occurred_at, |m| {
            m.archived = false;
        });
    }

    fn apply_deleted(&self, e: ProjectDeleted) {
        self.store.remove(e.company_id, &e.project_id);
    }

    fn update(
        &self,
        company_id: CompanyId,
        project_id: ProjectId,
        occurred_at: DateTime<Utc>,
        f: impl FnOnce(&mut ProjectReadModel),
    ) {
        if let Some(mut model) = self.store.get(company_id, &project_id) {
            f(&mut model);
            model.updated_at = occurred_at;
            self.store.upsert(company_id, project_id, model);
        }
    }

    pub fn get(&self, company_id: CompanyId, project_id: &ProjectId) -> Option<ProjectReadModel> {
        self.store.get(company_id, project_id)
    }

    /// List a company's projects, optionally filtered by archived state.
    pub fn list(&self, company_id: CompanyId, archived: Option<bool>) -> Vec<ProjectReadModel> {
        let mut projects: Vec<_> = self
            .store
            .list(company_id)
            .into_iter()
            .filter(|p| archived.is_none_or(|a| p.archived == a))
            .collect();
        projects.sort_by_key(|p| p.created_at);
        projects
    }

    /// List projects the member manages or is assigned to.
    pub fn list_mine(&self, company_id: CompanyId, member_id: MemberId) -> Vec<ProjectReadModel> {
        let mut projects: Vec<_> = self
            .store
            .list(company_id)
            .into_iter()
            .filter(|p| {
                p.manager_id == Some(member_id) || p.assigned_members.contains(&member_id)
            })
            .collect();
        projects.sort_by_key(|p| p.created_at);
        projects
    }

    /// Ownership snapshot for scope decisions. `None` means the project does
    /// not resolve within this company.
    pub fn scope(&self, company_id: CompanyId, project_id: &ProjectId) -> Option<ProjectScope> {
        self.store.get(company_id, project_id).map(|p| ProjectScope {
            company_id: p.company_id,
            manager_id: p.manager_id,
        })
    }
}
