//! Person domain model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gender {
    Female,
    Male,
    Unknown,
}

/// A physical person known to the hub.
///
/// Names and birth date are written by whichever source system owns
/// the person; everything else about a person lives in source-scoped
/// sub-records (external ids, affiliations, contact info).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePerson {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePerson {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// `Some(Some(d))` = set, `Some(None)` = clear, `None` = no change.
    pub birth_date: Option<Option<NaiveDate>>,
    pub gender: Option<Gender>,
}
