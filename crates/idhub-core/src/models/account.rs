//! Account domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Expired,
    Quarantined,
}

/// A user account owned by a person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// The username, unique hub-wide.
    pub name: String,
    pub status: AccountStatus,
    pub password_hash: String,
    pub expire_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub owner_id: Uuid,
    pub name: String,
    /// Raw password, hashed with Argon2id before storage.
    pub password: String,
    pub expire_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAccount {
    pub status: Option<AccountStatus>,
    /// `Some(Some(d))` = set, `Some(None)` = clear, `None` = no change.
    pub expire_date: Option<Option<NaiveDate>>,
}
