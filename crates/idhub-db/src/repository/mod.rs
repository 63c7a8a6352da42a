//! SurrealDB repository implementations.

mod account;
mod audit;
mod group;
mod org_unit;
mod person;
mod task;

pub use account::{SurrealAccountRepository, verify_password};
pub use audit::SurrealAuditLogRepository;
pub use group::SurrealGroupRepository;
pub use org_unit::SurrealOrgUnitRepository;
pub use person::SurrealPersonRepository;
pub use task::SurrealTaskRepository;
