//! SurrealDB implementation of [`OrgUnitRepository`].

use chrono::{DateTime, Utc};
use idhub_core::error::HubResult;
use idhub_core::models::org_unit::{CreateOrgUnit, OrgUnit, UpdateOrgUnit};
use idhub_core::repository::{OrgUnitRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct OrgUnitRow {
    placecode: String,
    name: String,
    parent_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `record::id(id)`.
#[derive(Debug, SurrealValue)]
struct OrgUnitRowWithId {
    record_id: String,
    placecode: String,
    name: String,
    parent_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_parent(parent_id: Option<String>) -> Result<Option<Uuid>, DbError> {
    parent_id
        .map(|p| {
            Uuid::parse_str(&p).map_err(|e| DbError::Decode(format!("invalid parent UUID: {e}")))
        })
        .transpose()
}

impl OrgUnitRow {
    fn into_org_unit(self, id: Uuid) -> Result<OrgUnit, DbError> {
        Ok(OrgUnit {
            id,
            placecode: self.placecode,
            name: self.name,
            parent_id: parse_parent(self.parent_id)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl OrgUnitRowWithId {
    fn try_into_org_unit(self) -> Result<OrgUnit, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        Ok(OrgUnit {
            id,
            placecode: self.placecode,
            name: self.name,
            parent_id: parse_parent(self.parent_id)?,
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

/// SurrealDB implementation of the org unit repository.
#[derive(Clone)]
pub struct SurrealOrgUnitRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrgUnitRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrgUnitRepository for SurrealOrgUnitRepository<C> {
    async fn create(&self, input: CreateOrgUnit) -> HubResult<OrgUnit> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('org_unit', $id) SET \
                 placecode = $placecode, \
                 name = $name, \
                 parent_id = $parent_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("placecode", input.placecode))
            .bind(("name", input.name))
            .bind(("parent_id", input.parent_id.map(|p| p.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<OrgUnitRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "org_unit".into(),
            id: id_str,
        })?;

        Ok(row.into_org_unit(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> HubResult<OrgUnit> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('org_unit', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrgUnitRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "org_unit".into(),
            id: id_str,
        })?;

        Ok(row.into_org_unit(id)?)
    }

    async fn get_by_placecode(&self, placecode: &str) -> HubResult<Option<OrgUnit>> {
        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM org_unit \
                 WHERE placecode = $placecode",
            )
            .bind(("placecode", placecode.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrgUnitRowWithId> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_org_unit()?)),
            None => Ok(None),
        }
    }

    async fn update(&self, id: Uuid, input: UpdateOrgUnit) -> HubResult<OrgUnit> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.parent_id.is_some() {
            sets.push("parent_id = $parent_id");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('org_unit', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(parent_id) = input.parent_id {
            // parent_id is Option<Option<Uuid>>: Some(Some(v)) = set, Some(None) = clear
            builder = builder.bind(("parent_id", parent_id.map(|p| p.to_string())));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        let rows: Vec<OrgUnitRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "org_unit".into(),
            id: id_str,
        })?;

        Ok(row.into_org_unit(id)?)
    }

    async fn list(&self, pagination: Pagination) -> HubResult<PaginatedResult<OrgUnit>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM org_unit GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT record::id(id) AS record_id, * FROM org_unit \
                 ORDER BY placecode ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrgUnitRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_org_unit())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
