//! Error types for the idhub system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Ambiguous match: external ids resolve to persons {first} and {second}")]
    AmbiguousMatch { first: String, second: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Datasource error: {0}")]
    Datasource(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HubResult<T> = Result<T, HubError>;
