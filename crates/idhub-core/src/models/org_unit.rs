//! Organizational unit domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A node of the organizational hierarchy.
///
/// `placecode` is the six-digit location code upstream systems use to
/// reference org units (faculty + department + section, two digits
/// each). It is the join key between HR feed rows and the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgUnit {
    pub id: Uuid,
    pub placecode: String,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrgUnit {
    pub placecode: String,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateOrgUnit {
    pub name: Option<String>,
    /// `Some(Some(id))` = set, `Some(None)` = detach, `None` = no change.
    pub parent_id: Option<Option<Uuid>>,
}
