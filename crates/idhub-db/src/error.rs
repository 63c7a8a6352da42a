//! Database-specific error types and conversions.

use idhub_core::error::HubError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Bad stored value: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for HubError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => HubError::NotFound { entity, id },
            other => HubError::Database(other.to_string()),
        }
    }
}
