//! SurrealDB-backed storage layer for the identity hub.
//!
//! Provides the schema migrations, connection management and the
//! concrete repository implementations for the traits defined in
//! `idhub-core`.

pub mod connection;
pub mod error;
pub mod repository;
pub mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::{
    SurrealAccountRepository, SurrealAuditLogRepository, SurrealGroupRepository,
    SurrealOrgUnitRepository, SurrealPersonRepository, SurrealTaskRepository, verify_password,
};
pub use schema::run_migrations;
