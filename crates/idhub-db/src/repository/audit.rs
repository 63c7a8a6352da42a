//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! The audit table is append-only; update and delete are denied by
//! table permissions.

use chrono::{DateTime, Utc};
use idhub_core::error::HubResult;
use idhub_core::models::audit::{AuditRecord, CreateAuditRecord};
use idhub_core::repository::{AuditFilter, AuditLogRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditRow {
    record_id: String,
    actor: String,
    operation: String,
    subject_id: String,
    detail: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl AuditRow {
    fn try_into_record(self) -> Result<AuditRecord, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        let subject_id = Uuid::parse_str(&self.subject_id)
            .map_err(|e| DbError::Decode(format!("invalid subject UUID: {e}")))?;
        Ok(AuditRecord {
            id,
            actor: self.actor,
            operation: self.operation,
            subject_id,
            detail: self.detail,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the audit log repository.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

/// Build the WHERE clause for an audit filter. Callers bind the
/// matching parameters themselves.
fn filter_clause(filter: &AuditFilter) -> String {
    let mut conditions = Vec::new();
    if filter.subject_id.is_some() {
        conditions.push("subject_id = $subject_id");
    }
    if filter.operation.is_some() {
        conditions.push("operation = $operation");
    }
    if filter.from.is_some() {
        conditions.push("timestamp >= $from");
    }
    if filter.to.is_some() {
        conditions.push("timestamp < $to");
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn append(&self, input: CreateAuditRecord) -> HubResult<AuditRecord> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let detail = input
            .detail
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 actor = $actor, \
                 operation = $operation, \
                 subject_id = $subject_id, \
                 detail = $detail",
            )
            .bind(("id", id_str.clone()))
            .bind(("actor", input.actor))
            .bind(("operation", input.operation))
            .bind(("subject_id", input.subject_id.to_string()))
            .bind(("detail", detail))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Decode(e.to_string()))?;

        #[derive(Debug, SurrealValue)]
        struct CreatedRow {
            actor: String,
            operation: String,
            subject_id: String,
            detail: serde_json::Value,
            timestamp: DateTime<Utc>,
        }

        let rows: Vec<CreatedRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;

        let subject_id = Uuid::parse_str(&row.subject_id)
            .map_err(|e| DbError::Decode(format!("invalid subject UUID: {e}")))?;

        Ok(AuditRecord {
            id,
            actor: row.actor,
            operation: row.operation,
            subject_id,
            detail: row.detail,
            timestamp: row.timestamp,
        })
    }

    async fn list(
        &self,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> HubResult<PaginatedResult<AuditRecord>> {
        let clause = filter_clause(&filter);

        let count_query = format!("SELECT count() AS total FROM audit_log {clause} GROUP ALL");
        let mut count_builder = self.db.query(&count_query);
        if let Some(subject_id) = filter.subject_id {
            count_builder = count_builder.bind(("subject_id", subject_id.to_string()));
        }
        if let Some(ref operation) = filter.operation {
            count_builder = count_builder.bind(("operation", operation.clone()));
        }
        if let Some(from) = filter.from {
            count_builder = count_builder.bind(("from", from));
        }
        if let Some(to) = filter.to {
            count_builder = count_builder.bind(("to", to));
        }
        let mut count_result = count_builder.await.map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let query = format!(
            "SELECT record::id(id) AS record_id, * FROM audit_log {clause} \
             ORDER BY timestamp ASC \
             LIMIT $limit START $offset"
        );
        let mut builder = self
            .db
            .query(&query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));
        if let Some(subject_id) = filter.subject_id {
            builder = builder.bind(("subject_id", subject_id.to_string()));
        }
        if let Some(operation) = filter.operation {
            builder = builder.bind(("operation", operation));
        }
        if let Some(from) = filter.from {
            builder = builder.bind(("from", from));
        }
        if let Some(to) = filter.to {
            builder = builder.bind(("to", to));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_record())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
