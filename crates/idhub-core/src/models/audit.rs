//! Audit log domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    /// Who made the change, e.g. `hr-import` or an operator name.
    pub actor: String,
    /// Operation identifier, e.g. `person.create`, `affiliation.remove`.
    pub operation: String,
    /// The entity the change applies to.
    pub subject_id: Uuid,
    pub detail: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditRecord {
    pub actor: String,
    pub operation: String,
    pub subject_id: Uuid,
    pub detail: Option<serde_json::Value>,
}
