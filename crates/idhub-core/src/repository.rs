//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Records owned by a source
//! system (external ids, affiliations, contact info) take an explicit
//! [`SourceSystem`] parameter so that imports only touch their own
//! rows.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::HubResult;
use crate::models::{
    account::{Account, CreateAccount, UpdateAccount},
    affiliation::Affiliation,
    audit::{AuditRecord, CreateAuditRecord},
    contact::ContactInfo,
    external_id::{ExternalId, ExternalIdType},
    group::{CreateGroup, Group, UpdateGroup},
    org_unit::{CreateOrgUnit, OrgUnit, UpdateOrgUnit},
    person::{CreatePerson, Person, UpdatePerson},
    quarantine::{Quarantine, QuarantineType},
    source::SourceSystem,
    task::{NewTask, Task},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Organizational units
// ---------------------------------------------------------------------------

pub trait OrgUnitRepository: Send + Sync {
    fn create(&self, input: CreateOrgUnit) -> impl Future<Output = HubResult<OrgUnit>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HubResult<OrgUnit>> + Send;
    /// Look up an org unit by its six-digit location code.
    fn get_by_placecode(
        &self,
        placecode: &str,
    ) -> impl Future<Output = HubResult<Option<OrgUnit>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateOrgUnit,
    ) -> impl Future<Output = HubResult<OrgUnit>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HubResult<PaginatedResult<OrgUnit>>> + Send;
}

// ---------------------------------------------------------------------------
// Persons and their source-scoped sub-records
// ---------------------------------------------------------------------------

pub trait PersonRepository: Send + Sync {
    fn create(&self, input: CreatePerson) -> impl Future<Output = HubResult<Person>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HubResult<Person>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePerson,
    ) -> impl Future<Output = HubResult<Person>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HubResult<PaginatedResult<Person>>> + Send;

    /// Find the person holding a given external id, regardless of
    /// source system. At most one person may hold any (type, value).
    fn find_by_external_id(
        &self,
        id_type: ExternalIdType,
        value: &str,
    ) -> impl Future<Output = HubResult<Option<Person>>> + Send;

    fn list_external_ids(
        &self,
        person_id: Uuid,
        source: SourceSystem,
    ) -> impl Future<Output = HubResult<Vec<ExternalId>>> + Send;
    fn set_external_id(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        external_id: &ExternalId,
    ) -> impl Future<Output = HubResult<()>> + Send;
    fn remove_external_id(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        id_type: ExternalIdType,
    ) -> impl Future<Output = HubResult<()>> + Send;

    fn list_affiliations(
        &self,
        person_id: Uuid,
        source: SourceSystem,
    ) -> impl Future<Output = HubResult<Vec<Affiliation>>> + Send;
    fn add_affiliation(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        affiliation: &Affiliation,
    ) -> impl Future<Output = HubResult<()>> + Send;
    fn remove_affiliation(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        affiliation: &Affiliation,
    ) -> impl Future<Output = HubResult<()>> + Send;

    fn list_contact_info(
        &self,
        person_id: Uuid,
        source: SourceSystem,
    ) -> impl Future<Output = HubResult<Vec<ContactInfo>>> + Send;
    fn add_contact_info(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        contact: &ContactInfo,
    ) -> impl Future<Output = HubResult<()>> + Send;
    fn remove_contact_info(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        contact: &ContactInfo,
    ) -> impl Future<Output = HubResult<()>> + Send;

    fn list_quarantines(
        &self,
        person_id: Uuid,
    ) -> impl Future<Output = HubResult<Vec<Quarantine>>> + Send;
    fn add_quarantine(
        &self,
        person_id: Uuid,
        quarantine: &Quarantine,
    ) -> impl Future<Output = HubResult<()>> + Send;
    fn clear_quarantine(
        &self,
        person_id: Uuid,
        quarantine_type: QuarantineType,
    ) -> impl Future<Output = HubResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub trait AccountRepository: Send + Sync {
    /// Create an account; the raw password is hashed before storage.
    fn create(&self, input: CreateAccount) -> impl Future<Output = HubResult<Account>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HubResult<Account>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = HubResult<Account>> + Send;
    fn list_by_owner(
        &self,
        owner_id: Uuid,
    ) -> impl Future<Output = HubResult<Vec<Account>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateAccount,
    ) -> impl Future<Output = HubResult<Account>> + Send;
    fn set_password(
        &self,
        id: Uuid,
        password: &str,
    ) -> impl Future<Output = HubResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

pub trait GroupRepository: Send + Sync {
    fn create(&self, input: CreateGroup) -> impl Future<Output = HubResult<Group>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HubResult<Group>> + Send;
    fn get_by_name(&self, name: &str) -> impl Future<Output = HubResult<Option<Group>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateGroup,
    ) -> impl Future<Output = HubResult<Group>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = HubResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HubResult<PaginatedResult<Group>>> + Send;

    /// Add a person to a group; adding an existing member is a no-op.
    fn add_member(
        &self,
        group_id: Uuid,
        person_id: Uuid,
    ) -> impl Future<Output = HubResult<()>> + Send;
    fn remove_member(
        &self,
        group_id: Uuid,
        person_id: Uuid,
    ) -> impl Future<Output = HubResult<()>> + Send;
    fn get_members(&self, group_id: Uuid) -> impl Future<Output = HubResult<Vec<Person>>> + Send;
    fn get_member_groups(
        &self,
        person_id: Uuid,
    ) -> impl Future<Output = HubResult<Vec<Group>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

/// Query filters for audit records.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub subject_id: Option<Uuid>,
    pub operation: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a record. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditRecord,
    ) -> impl Future<Output = HubResult<AuditRecord>> + Send;
    fn list(
        &self,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> impl Future<Output = HubResult<PaginatedResult<AuditRecord>>> + Send;
}

// ---------------------------------------------------------------------------
// Task queue
// ---------------------------------------------------------------------------

/// Query filters for task searches.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub queues: Vec<String>,
    pub nbf_before: Option<DateTime<Utc>>,
    pub max_attempts: Option<u32>,
}

pub trait TaskRepository: Send + Sync {
    /// Insert or update a task.
    ///
    /// When `ignore_nbf_after` is true and the task already exists
    /// with an earlier `nbf`, the push is dropped: a retry that is
    /// already due sooner must never be delayed. Returns the stored
    /// task, or `None` when the push was a no-op.
    fn push(
        &self,
        task: NewTask,
        ignore_nbf_after: bool,
    ) -> impl Future<Output = HubResult<Option<Task>>> + Send;

    fn get(&self, queue: &str, key: &str)
    -> impl Future<Output = HubResult<Option<Task>>> + Send;

    /// Remove and return a specific task.
    fn pop(&self, queue: &str, key: &str) -> impl Future<Output = HubResult<Task>> + Send;

    /// Remove and return the next due task, ordered by (queue, nbf,
    /// iat). Tasks at or above `max_attempts` are never returned.
    fn pop_next(&self, filter: &TaskFilter)
    -> impl Future<Output = HubResult<Option<Task>>> + Send;

    fn search(&self, filter: &TaskFilter) -> impl Future<Output = HubResult<Vec<Task>>> + Send;

    /// Number of queued tasks per queue name.
    fn queue_counts(&self) -> impl Future<Output = HubResult<Vec<(String, u64)>>> + Send;
}
