//! SurrealDB implementation of [`PersonRepository`].
//!
//! Source-scoped sub-records (external ids, affiliations, contact
//! info) live in their own tables keyed by `person_id` and `source`,
//! so that each import only ever touches rows it owns.

use chrono::{DateTime, NaiveDate, Utc};
use idhub_core::error::{HubError, HubResult};
use idhub_core::models::affiliation::{Affiliation, AffiliationKind, AffiliationStatus};
use idhub_core::models::contact::{ContactInfo, ContactType};
use idhub_core::models::external_id::{ExternalId, ExternalIdType};
use idhub_core::models::person::{CreatePerson, Gender, Person, UpdatePerson};
use idhub_core::models::quarantine::{Quarantine, QuarantineType};
use idhub_core::models::source::SourceSystem;
use idhub_core::repository::{PaginatedResult, Pagination, PersonRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct PersonRow {
    first_name: String,
    last_name: String,
    birth_date: Option<String>,
    gender: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `record::id(id)`.
#[derive(Debug, SurrealValue)]
struct PersonRowWithId {
    record_id: String,
    first_name: String,
    last_name: String,
    birth_date: Option<String>,
    gender: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ExternalIdRow {
    id_type: String,
    value: String,
}

#[derive(Debug, SurrealValue)]
struct PersonIdRow {
    person_id: String,
}

#[derive(Debug, SurrealValue)]
struct AffiliationRow {
    ou_id: String,
    kind: String,
    status: String,
    precedence: Option<u32>,
}

#[derive(Debug, SurrealValue)]
struct ContactRow {
    contact_type: String,
    preference: u32,
    value: String,
}

#[derive(Debug, SurrealValue)]
struct QuarantineRow {
    quarantine_type: String,
    reason: String,
    start_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
}

fn parse_gender(s: &str) -> Result<Gender, DbError> {
    match s {
        "Female" => Ok(Gender::Female),
        "Male" => Ok(Gender::Male),
        "Unknown" => Ok(Gender::Unknown),
        other => Err(DbError::Decode(format!("unknown gender: {other}"))),
    }
}

fn gender_to_string(g: Gender) -> &'static str {
    match g {
        Gender::Female => "Female",
        Gender::Male => "Male",
        Gender::Unknown => "Unknown",
    }
}

fn date_to_string(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DbError::Decode(format!("invalid date '{s}': {e}")))
}

impl PersonRow {
    fn into_person(self, id: Uuid) -> Result<Person, DbError> {
        Ok(Person {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date: self.birth_date.as_deref().map(parse_date).transpose()?,
            gender: parse_gender(&self.gender)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl PersonRowWithId {
    fn try_into_person(self) -> Result<Person, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        Ok(Person {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date: self.birth_date.as_deref().map(parse_date).transpose()?,
            gender: parse_gender(&self.gender)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AffiliationRow {
    fn try_into_affiliation(self) -> Result<Affiliation, DbError> {
        let ou_id = Uuid::parse_str(&self.ou_id)
            .map_err(|e| DbError::Decode(format!("invalid ou UUID: {e}")))?;
        let kind = AffiliationKind::parse(&self.kind)
            .ok_or_else(|| DbError::Decode(format!("unknown affiliation kind: {}", self.kind)))?;
        let status = AffiliationStatus::parse(&self.status).ok_or_else(|| {
            DbError::Decode(format!("unknown affiliation status: {}", self.status))
        })?;
        let precedence = self
            .precedence
            .map(|p| {
                u16::try_from(p)
                    .map_err(|_| DbError::Decode(format!("precedence out of range: {p}")))
            })
            .transpose()?;
        Ok(Affiliation {
            ou_id,
            kind,
            status,
            precedence,
        })
    }
}

impl ContactRow {
    fn try_into_contact(self) -> Result<ContactInfo, DbError> {
        let contact_type = ContactType::parse(&self.contact_type).ok_or_else(|| {
            DbError::Decode(format!("unknown contact type: {}", self.contact_type))
        })?;
        let preference = u16::try_from(self.preference).map_err(|_| {
            DbError::Decode(format!("preference out of range: {}", self.preference))
        })?;
        Ok(ContactInfo {
            contact_type,
            preference,
            value: self.value,
        })
    }
}

impl QuarantineRow {
    fn try_into_quarantine(self) -> Result<Quarantine, DbError> {
        let quarantine_type = QuarantineType::parse(&self.quarantine_type).ok_or_else(|| {
            DbError::Decode(format!(
                "unknown quarantine type: {}",
                self.quarantine_type
            ))
        })?;
        Ok(Quarantine {
            quarantine_type,
            reason: self.reason,
            start_at: self.start_at,
            end_at: self.end_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the person repository.
#[derive(Clone)]
pub struct SurrealPersonRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPersonRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PersonRepository for SurrealPersonRepository<C> {
    async fn create(&self, input: CreatePerson) -> HubResult<Person> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('person', $id) SET \
                 first_name = $first_name, \
                 last_name = $last_name, \
                 birth_date = $birth_date, \
                 gender = $gender",
            )
            .bind(("id", id_str.clone()))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("birth_date", input.birth_date.map(date_to_string)))
            .bind(("gender", gender_to_string(input.gender).to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<PersonRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "person".into(),
            id: id_str,
        })?;

        Ok(row.into_person(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> HubResult<Person> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('person', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PersonRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "person".into(),
            id: id_str,
        })?;

        Ok(row.into_person(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdatePerson) -> HubResult<Person> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.birth_date.is_some() {
            sets.push("birth_date = $birth_date");
        }
        if input.gender.is_some() {
            sets.push("gender = $gender");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('person', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(birth_date) = input.birth_date {
            // birth_date is Option<Option<NaiveDate>>: Some(Some(d)) = set, Some(None) = clear
            builder = builder.bind(("birth_date", birth_date.map(date_to_string)));
        }
        if let Some(gender) = input.gender {
            builder = builder.bind(("gender", gender_to_string(gender).to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<PersonRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "person".into(),
            id: id_str,
        })?;

        Ok(row.into_person(id)?)
    }

    async fn list(&self, pagination: Pagination) -> HubResult<PaginatedResult<Person>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM person GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM person \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PersonRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_person())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn find_by_external_id(
        &self,
        id_type: ExternalIdType,
        value: &str,
    ) -> HubResult<Option<Person>> {
        let mut result = self
            .db
            .query(
                "SELECT person_id FROM external_id \
                 WHERE id_type = $id_type AND value = $value",
            )
            .bind(("id_type", id_type.as_str().to_string()))
            .bind(("value", value.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PersonIdRow> = result.take(0).map_err(DbError::from)?;
        let mut person_ids: Vec<String> = rows.into_iter().map(|r| r.person_id).collect();
        person_ids.sort();
        person_ids.dedup();

        match person_ids.len() {
            0 => Ok(None),
            1 => {
                let person_id = Uuid::parse_str(&person_ids[0])
                    .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
                Ok(Some(self.get_by_id(person_id).await?))
            }
            // Different source systems claim the same id value for
            // different persons. Refuse to pick one.
            _ => Err(HubError::AmbiguousMatch {
                first: person_ids[0].clone(),
                second: person_ids[1].clone(),
            }),
        }
    }

    async fn list_external_ids(
        &self,
        person_id: Uuid,
        source: SourceSystem,
    ) -> HubResult<Vec<ExternalId>> {
        let mut result = self
            .db
            .query(
                "SELECT id_type, value FROM external_id \
                 WHERE person_id = $person_id AND source = $source",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("source", source.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ExternalIdRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .map(|row| {
                let id_type = ExternalIdType::parse(&row.id_type).ok_or_else(|| {
                    HubError::from(DbError::Decode(format!(
                        "unknown external id type: {}",
                        row.id_type
                    )))
                })?;
                Ok(ExternalId::new(id_type, row.value))
            })
            .collect()
    }

    async fn set_external_id(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        external_id: &ExternalId,
    ) -> HubResult<()> {
        // Replace any existing value of this type, then insert. One
        // statement pair so a failed insert cannot drop the old row
        // without a trace in the response.
        self.db
            .query(
                "DELETE external_id WHERE person_id = $person_id \
                 AND source = $source AND id_type = $id_type; \
                 CREATE external_id SET \
                 person_id = $person_id, source = $source, \
                 id_type = $id_type, value = $value;",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("source", source.as_str().to_string()))
            .bind(("id_type", external_id.id_type.as_str().to_string()))
            .bind(("value", external_id.value.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Decode(e.to_string()))?;

        Ok(())
    }

    async fn remove_external_id(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        id_type: ExternalIdType,
    ) -> HubResult<()> {
        self.db
            .query(
                "DELETE external_id WHERE person_id = $person_id \
                 AND source = $source AND id_type = $id_type",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("source", source.as_str().to_string()))
            .bind(("id_type", id_type.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_affiliations(
        &self,
        person_id: Uuid,
        source: SourceSystem,
    ) -> HubResult<Vec<Affiliation>> {
        let mut result = self
            .db
            .query(
                "SELECT ou_id, kind, status, precedence FROM affiliation \
                 WHERE person_id = $person_id AND source = $source",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("source", source.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AffiliationRow> = result.take(0).map_err(DbError::from)?;
        let affiliations = rows
            .into_iter()
            .map(|row| row.try_into_affiliation())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(affiliations)
    }

    async fn add_affiliation(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        affiliation: &Affiliation,
    ) -> HubResult<()> {
        self.db
            .query(
                "CREATE affiliation SET \
                 person_id = $person_id, source = $source, \
                 ou_id = $ou_id, kind = $kind, status = $status, \
                 precedence = $precedence",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("source", source.as_str().to_string()))
            .bind(("ou_id", affiliation.ou_id.to_string()))
            .bind(("kind", affiliation.kind.as_str().to_string()))
            .bind(("status", affiliation.status.as_str().to_string()))
            .bind(("precedence", affiliation.precedence.map(u32::from)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Decode(e.to_string()))?;

        Ok(())
    }

    async fn remove_affiliation(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        affiliation: &Affiliation,
    ) -> HubResult<()> {
        self.db
            .query(
                "DELETE affiliation WHERE person_id = $person_id \
                 AND source = $source AND ou_id = $ou_id \
                 AND kind = $kind AND status = $status",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("source", source.as_str().to_string()))
            .bind(("ou_id", affiliation.ou_id.to_string()))
            .bind(("kind", affiliation.kind.as_str().to_string()))
            .bind(("status", affiliation.status.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_contact_info(
        &self,
        person_id: Uuid,
        source: SourceSystem,
    ) -> HubResult<Vec<ContactInfo>> {
        let mut result = self
            .db
            .query(
                "SELECT contact_type, preference, value FROM contact_info \
                 WHERE person_id = $person_id AND source = $source \
                 ORDER BY contact_type, preference",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("source", source.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ContactRow> = result.take(0).map_err(DbError::from)?;
        let contacts = rows
            .into_iter()
            .map(|row| row.try_into_contact())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(contacts)
    }

    async fn add_contact_info(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        contact: &ContactInfo,
    ) -> HubResult<()> {
        self.db
            .query(
                "CREATE contact_info SET \
                 person_id = $person_id, source = $source, \
                 contact_type = $contact_type, \
                 preference = $preference, value = $value",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("source", source.as_str().to_string()))
            .bind(("contact_type", contact.contact_type.as_str().to_string()))
            .bind(("preference", u32::from(contact.preference)))
            .bind(("value", contact.value.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Decode(e.to_string()))?;

        Ok(())
    }

    async fn remove_contact_info(
        &self,
        person_id: Uuid,
        source: SourceSystem,
        contact: &ContactInfo,
    ) -> HubResult<()> {
        self.db
            .query(
                "DELETE contact_info WHERE person_id = $person_id \
                 AND source = $source AND contact_type = $contact_type \
                 AND preference = $preference",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("source", source.as_str().to_string()))
            .bind(("contact_type", contact.contact_type.as_str().to_string()))
            .bind(("preference", u32::from(contact.preference)))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_quarantines(&self, person_id: Uuid) -> HubResult<Vec<Quarantine>> {
        let mut result = self
            .db
            .query(
                "SELECT quarantine_type, reason, start_at, end_at \
                 FROM quarantine WHERE person_id = $person_id",
            )
            .bind(("person_id", person_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<QuarantineRow> = result.take(0).map_err(DbError::from)?;
        let quarantines = rows
            .into_iter()
            .map(|row| row.try_into_quarantine())
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(quarantines)
    }

    async fn add_quarantine(&self, person_id: Uuid, quarantine: &Quarantine) -> HubResult<()> {
        // One quarantine per type per person: replace the existing one.
        self.db
            .query(
                "DELETE quarantine WHERE person_id = $person_id \
                 AND quarantine_type = $quarantine_type; \
                 CREATE quarantine SET \
                 person_id = $person_id, \
                 quarantine_type = $quarantine_type, \
                 reason = $reason, start_at = $start_at, \
                 end_at = $end_at;",
            )
            .bind(("person_id", person_id.to_string()))
            .bind((
                "quarantine_type",
                quarantine.quarantine_type.as_str().to_string(),
            ))
            .bind(("reason", quarantine.reason.clone()))
            .bind(("start_at", quarantine.start_at))
            .bind(("end_at", quarantine.end_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Decode(e.to_string()))?;

        Ok(())
    }

    async fn clear_quarantine(
        &self,
        person_id: Uuid,
        quarantine_type: QuarantineType,
    ) -> HubResult<()> {
        self.db
            .query(
                "DELETE quarantine WHERE person_id = $person_id \
                 AND quarantine_type = $quarantine_type",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("quarantine_type", quarantine_type.as_str().to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
