//! SurrealDB implementation of [`GroupRepository`].
//!
//! Membership is stored as `member_of` relation edges from person
//! records to group records.

use chrono::{DateTime, Utc};
use idhub_core::error::HubResult;
use idhub_core::models::group::{CreateGroup, Group, UpdateGroup};
use idhub_core::models::person::{Gender, Person};
use idhub_core::repository::{GroupRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct GroupRow {
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `record::id(id)`.
#[derive(Debug, SurrealValue)]
struct GroupRowWithId {
    record_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Person row fetched through the membership edge.
#[derive(Debug, SurrealValue)]
struct MemberRow {
    record_id: String,
    first_name: String,
    last_name: String,
    birth_date: Option<String>,
    gender: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRow {
    fn into_group(self, id: Uuid) -> Group {
        Group {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl GroupRowWithId {
    fn try_into_group(self) -> Result<Group, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        Ok(Group {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl MemberRow {
    fn try_into_person(self) -> Result<Person, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        let gender = match self.gender.as_str() {
            "Female" => Gender::Female,
            "Male" => Gender::Male,
            "Unknown" => Gender::Unknown,
            other => return Err(DbError::Decode(format!("unknown gender: {other}"))),
        };
        let birth_date = self
            .birth_date
            .as_deref()
            .map(|d| {
                chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|e| DbError::Decode(format!("invalid date '{d}': {e}")))
            })
            .transpose()?;
        Ok(Person {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date,
            gender,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the group repository.
#[derive(Clone)]
pub struct SurrealGroupRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGroupRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> GroupRepository for SurrealGroupRepository<C> {
    async fn create(&self, input: CreateGroup) -> HubResult<Group> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('group', $id) SET \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn get_by_id(&self, id: Uuid) -> HubResult<Group> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('group', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn get_by_name(&self, name: &str) -> HubResult<Option<Group>> {
        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM group \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_group()?)),
            None => Ok(None),
        }
    }

    async fn update(&self, id: Uuid, input: UpdateGroup) -> HubResult<Group> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('group', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(row.into_group(id))
    }

    async fn delete(&self, id: Uuid) -> HubResult<()> {
        // Delete associated membership edges first, then the group record.
        self.db
            .query(
                "DELETE member_of WHERE out = type::record('group', $id); \
                 DELETE type::record('group', $id);",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> HubResult<PaginatedResult<Group>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM group GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM group \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn add_member(&self, group_id: Uuid, person_id: Uuid) -> HubResult<()> {
        let group_id_str = group_id.to_string();
        let person_id_str = person_id.to_string();

        // Verify both records exist before creating the edge.
        let mut check = self
            .db
            .query(
                "SELECT count() AS total FROM person \
                 WHERE id = type::record('person', $person_id) GROUP ALL; \
                 SELECT count() AS total FROM group \
                 WHERE id = type::record('group', $group_id) GROUP ALL;",
            )
            .bind(("person_id", person_id_str.clone()))
            .bind(("group_id", group_id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let person_count: Vec<CountRow> = check.take(0).map_err(DbError::from)?;
        if person_count.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::NotFound {
                entity: "person".into(),
                id: person_id_str,
            }
            .into());
        }

        let group_count: Vec<CountRow> = check.take(1).map_err(DbError::from)?;
        if group_count.first().map(|r| r.total).unwrap_or(0) == 0 {
            return Err(DbError::NotFound {
                entity: "group".into(),
                id: group_id_str,
            }
            .into());
        }

        // Adding an existing member is a no-op: drop duplicate edges
        // before relating.
        self.db
            .query(
                "DELETE member_of WHERE \
                 in = type::record('person', $person_id) AND \
                 out = type::record('group', $group_id); \
                 RELATE (type::record('person', $person_id)) \
                 -> member_of -> (type::record('group', $group_id));",
            )
            .bind(("person_id", person_id_str))
            .bind(("group_id", group_id_str))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn remove_member(&self, group_id: Uuid, person_id: Uuid) -> HubResult<()> {
        self.db
            .query(
                "DELETE member_of WHERE \
                 in = type::record('person', $person_id) AND \
                 out = type::record('group', $group_id)",
            )
            .bind(("person_id", person_id.to_string()))
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn get_members(&self, group_id: Uuid) -> HubResult<Vec<Person>> {
        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM person \
                 WHERE id IN (\
                     SELECT VALUE in FROM member_of \
                     WHERE out = type::record('group', $group_id)\
                 ) \
                 ORDER BY last_name ASC, first_name ASC",
            )
            .bind(("group_id", group_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MemberRow> = result.take(0).map_err(DbError::from)?;

        let members = rows
            .into_iter()
            .map(|row| row.try_into_person())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(members)
    }

    async fn get_member_groups(&self, person_id: Uuid) -> HubResult<Vec<Group>> {
        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM group \
                 WHERE id IN (\
                     SELECT VALUE out FROM member_of \
                     WHERE in = type::record('person', $person_id)\
                 ) \
                 ORDER BY name ASC",
            )
            .bind(("person_id", person_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;

        let groups = rows
            .into_iter()
            .map(|row| row.try_into_group())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(groups)
    }
}
