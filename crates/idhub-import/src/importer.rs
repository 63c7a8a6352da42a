//! The employee import: create, update or remove persons from mapped
//! HR data, and reschedule records whose state changes later.

use chrono::{NaiveDate, NaiveTime, Utc};
use idhub_core::error::HubResult;
use idhub_core::models::affiliation::Affiliation;
use idhub_core::models::audit::CreateAuditRecord;
use idhub_core::models::external_id::ExternalIdType;
use idhub_core::models::group::{CreateGroup, Group};
use idhub_core::models::person::{CreatePerson, Person, UpdatePerson};
use idhub_core::models::quarantine::{Quarantine, QuarantineType};
use idhub_core::models::source::SourceSystem;
use idhub_core::models::task::NewTask;
use idhub_core::repository::{
    AuditLogRepository, GroupRepository, OrgUnitRepository, PersonRepository, TaskRepository,
};
use serde_json::json;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::datasource::EmployeeBundle;
use crate::mapper::{self, HrPerson};
use crate::matcher;

/// Import behavior knobs.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Source system the import writes as.
    pub source: SourceSystem,
    /// Queue for deferred re-imports.
    pub queue: String,
    /// Group holding persons reserved from publication.
    pub reservation_group: String,
    /// Actor name written to the audit log.
    pub actor: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            source: SourceSystem::Hr,
            queue: "hr-import".into(),
            reservation_group: "hr-reservations".into(),
            actor: "hr-import".into(),
        }
    }
}

/// What an import run did with one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportAction {
    Created,
    Updated,
    Removed,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub action: ImportAction,
    pub person_id: Option<Uuid>,
    /// Set when a re-import was scheduled for a future date.
    pub deferred_until: Option<NaiveDate>,
}

/// Imports one employee record at a time through the repositories.
pub struct EmployeeImporter<P, O, G, A, T> {
    persons: P,
    org_units: O,
    groups: G,
    audit: A,
    tasks: T,
    config: ImportConfig,
    today: NaiveDate,
}

impl<P, O, G, A, T> EmployeeImporter<P, O, G, A, T>
where
    P: PersonRepository,
    O: OrgUnitRepository,
    G: GroupRepository,
    A: AuditLogRepository,
    T: TaskRepository,
{
    pub fn new(persons: P, org_units: O, groups: G, audit: A, tasks: T) -> Self {
        Self {
            persons,
            org_units,
            groups,
            audit,
            tasks,
            config: ImportConfig::default(),
            today: Utc::now().date_naive(),
        }
    }

    pub fn with_config(mut self, config: ImportConfig) -> Self {
        self.config = config;
        self
    }

    /// Fix the date used for validity windows. For tests.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Reconcile one feed document against the database.
    pub async fn handle_employee(&self, bundle: &EmployeeBundle) -> HubResult<ImportOutcome> {
        let hr_person = mapper::map_employee(bundle, self.today);
        let active = mapper::is_active(bundle, self.today);
        let matched = matcher::find_candidate(&self.persons, &hr_person).await?;

        let (action, person_id) = match (matched, active) {
            (None, true) => {
                let person = self.create(&hr_person).await?;
                (ImportAction::Created, Some(person.id))
            }
            (Some(person), true) => {
                self.update(&person, &hr_person).await?;
                (ImportAction::Updated, Some(person.id))
            }
            (Some(person), false) => {
                self.remove(&person, &hr_person).await?;
                (ImportAction::Removed, Some(person.id))
            }
            (None, false) => {
                debug!(hr_id = %hr_person.hr_id, "unknown inactive person, nothing to do");
                (ImportAction::Skipped, None)
            }
        };

        let deferred_until = self.defer(&hr_person, bundle).await?;

        Ok(ImportOutcome {
            action,
            person_id,
            deferred_until,
        })
    }

    /// Schedule a re-import on the next date the record's active
    /// state may change. An already-queued earlier retry wins.
    async fn defer(
        &self,
        hr_person: &HrPerson,
        bundle: &EmployeeBundle,
    ) -> HubResult<Option<NaiveDate>> {
        let Some(next_change) = mapper::retry_dates(bundle, self.today).into_iter().next() else {
            return Ok(None);
        };

        let nbf = next_change.and_time(NaiveTime::MIN).and_utc();
        let task = NewTask::new(self.config.queue.clone(), hr_person.hr_id.clone())
            .with_nbf(nbf)
            .with_reason(format!("source data changes on {next_change}"));

        let pushed = self.tasks.push(task, true).await?;
        if pushed.is_some() {
            info!(
                hr_id = %hr_person.hr_id,
                date = %next_change,
                "scheduled re-import"
            );
        }
        Ok(Some(next_change))
    }

    async fn create(&self, hr_person: &HrPerson) -> HubResult<Person> {
        let person = self
            .persons
            .create(CreatePerson {
                first_name: hr_person.first_name.clone(),
                last_name: hr_person.last_name.clone(),
                birth_date: hr_person.birth_date,
                gender: hr_person.gender,
            })
            .await?;
        info!(hr_id = %hr_person.hr_id, person_id = %person.id, "created person");

        self.audit
            .append(CreateAuditRecord {
                actor: self.config.actor.clone(),
                operation: "person.create".into(),
                subject_id: person.id,
                detail: Some(json!({ "hr_id": hr_person.hr_id })),
            })
            .await?;

        self.sync(&person, hr_person).await?;
        Ok(person)
    }

    async fn update(&self, person: &Person, hr_person: &HrPerson) -> HubResult<()> {
        let mut changes = UpdatePerson::default();
        if person.first_name != hr_person.first_name {
            changes.first_name = Some(hr_person.first_name.clone());
        }
        if person.last_name != hr_person.last_name {
            changes.last_name = Some(hr_person.last_name.clone());
        }
        if person.birth_date != hr_person.birth_date {
            changes.birth_date = Some(hr_person.birth_date);
        }
        if person.gender != hr_person.gender {
            changes.gender = Some(hr_person.gender);
        }
        let person_row_changed = changes.first_name.is_some()
            || changes.last_name.is_some()
            || changes.birth_date.is_some()
            || changes.gender.is_some();
        if person_row_changed {
            self.persons.update(person.id, changes).await?;
        }

        self.sync(person, hr_person).await?;

        // An active record supersedes an earlier removal: lift the
        // inactivity quarantine so the person's accounts come back.
        let quarantined = self
            .persons
            .list_quarantines(person.id)
            .await?
            .iter()
            .any(|q| q.quarantine_type == QuarantineType::AutoInactive);
        if quarantined {
            self.persons
                .clear_quarantine(person.id, QuarantineType::AutoInactive)
                .await?;
            info!(
                hr_id = %hr_person.hr_id,
                person_id = %person.id,
                "lifted inactivity quarantine"
            );
        }

        info!(hr_id = %hr_person.hr_id, person_id = %person.id, "updated person");

        self.audit
            .append(CreateAuditRecord {
                actor: self.config.actor.clone(),
                operation: "person.update".into(),
                subject_id: person.id,
                detail: Some(json!({ "hr_id": hr_person.hr_id })),
            })
            .await?;
        Ok(())
    }

    /// Write the source-scoped sub-records: set-diff against current
    /// state, removals first.
    async fn sync(&self, person: &Person, hr_person: &HrPerson) -> HubResult<()> {
        let source = self.config.source;

        // External ids
        let existing: BTreeSet<_> = self
            .persons
            .list_external_ids(person.id, source)
            .await?
            .into_iter()
            .collect();
        for ext_id in existing.difference(&hr_person.external_ids) {
            self.persons
                .remove_external_id(person.id, source, ext_id.id_type)
                .await?;
        }
        for ext_id in hr_person.external_ids.difference(&existing) {
            self.persons
                .set_external_id(person.id, source, ext_id)
                .await?;
        }

        // Contact info
        let existing: BTreeSet<_> = self
            .persons
            .list_contact_info(person.id, source)
            .await?
            .into_iter()
            .collect();
        for contact in existing.difference(&hr_person.contacts) {
            self.persons
                .remove_contact_info(person.id, source, contact)
                .await?;
        }
        for contact in hr_person.contacts.difference(&existing) {
            self.persons
                .add_contact_info(person.id, source, contact)
                .await?;
        }

        // Affiliations, with location codes resolved to org units
        let mut mapped = BTreeSet::new();
        for hr_aff in &hr_person.affiliations {
            let Some(ou) = self.org_units.get_by_placecode(&hr_aff.placecode).await? else {
                warn!(
                    hr_id = %hr_person.hr_id,
                    placecode = %hr_aff.placecode,
                    "skipping affiliation at unknown org unit"
                );
                continue;
            };
            mapped.insert(Affiliation {
                ou_id: ou.id,
                kind: hr_aff.kind,
                status: hr_aff.status,
                precedence: hr_aff.precedence,
            });
        }
        let existing: BTreeSet<_> = self
            .persons
            .list_affiliations(person.id, source)
            .await?
            .into_iter()
            .collect();
        for aff in existing.difference(&mapped) {
            self.persons
                .remove_affiliation(person.id, source, aff)
                .await?;
        }
        for aff in mapped.difference(&existing) {
            self.persons.add_affiliation(person.id, source, aff).await?;
        }

        // Reservation flag as group membership
        self.sync_reservation(person, hr_person.reserved).await?;

        Ok(())
    }

    async fn reservation_group(&self) -> HubResult<Group> {
        if let Some(group) = self
            .groups
            .get_by_name(&self.config.reservation_group)
            .await?
        {
            return Ok(group);
        }
        self.groups
            .create(CreateGroup {
                name: self.config.reservation_group.clone(),
                description: "persons reserved from publication".into(),
            })
            .await
    }

    async fn sync_reservation(&self, person: &Person, reserved: bool) -> HubResult<()> {
        let group = self.reservation_group().await?;
        let is_member = self
            .groups
            .get_member_groups(person.id)
            .await?
            .iter()
            .any(|g| g.id == group.id);

        if reserved && !is_member {
            self.groups.add_member(group.id, person.id).await?;
        } else if !reserved && is_member {
            self.groups.remove_member(group.id, person.id).await?;
        }
        Ok(())
    }

    /// Clear HR-sourced data from a person who left the source
    /// system. The source person id stays behind as an anchor so a
    /// returning person matches their old record.
    async fn remove(&self, person: &Person, hr_person: &HrPerson) -> HubResult<()> {
        let source = self.config.source;

        for aff in self.persons.list_affiliations(person.id, source).await? {
            self.persons
                .remove_affiliation(person.id, source, &aff)
                .await?;
        }
        for contact in self.persons.list_contact_info(person.id, source).await? {
            self.persons
                .remove_contact_info(person.id, source, &contact)
                .await?;
        }
        for ext_id in self.persons.list_external_ids(person.id, source).await? {
            if ext_id.id_type == ExternalIdType::SourcePersonId {
                continue;
            }
            self.persons
                .remove_external_id(person.id, source, ext_id.id_type)
                .await?;
        }

        self.sync_reservation(person, false).await?;

        self.persons
            .add_quarantine(
                person.id,
                &Quarantine {
                    quarantine_type: QuarantineType::AutoInactive,
                    reason: "no active source system ties".into(),
                    start_at: Utc::now(),
                    end_at: None,
                },
            )
            .await?;

        info!(hr_id = %hr_person.hr_id, person_id = %person.id, "removed person data");

        self.audit
            .append(CreateAuditRecord {
                actor: self.config.actor.clone(),
                operation: "person.remove".into(),
                subject_id: person.id,
                detail: Some(json!({ "hr_id": hr_person.hr_id })),
            })
            .await?;
        Ok(())
    }
}
