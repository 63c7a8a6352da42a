//! Parsing of the upstream HR feed.
//!
//! The feed delivers one JSON document per employee. Unknown fields
//! are ignored so upstream schema additions do not break the import.
//! A document carrying only a `person_id` is a tombstone: the person
//! no longer exists in the source system.

use chrono::NaiveDate;
use idhub_core::error::{HubError, HubResult};
use serde::Deserialize;

/// Person payload of the feed document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeData {
    /// The source system's own person key.
    pub person_id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Source-side gender value, e.g. "Kvinne" or "Mann".
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub registration_completed_date: Option<NaiveDate>,
    /// Reservation from publication in directories.
    #[serde(default)]
    pub reserved: bool,
    #[serde(default)]
    pub identities: Vec<IdentityData>,
}

/// One identity or contact entry attached to a person.
///
/// The feed mixes identity documents and contact channels in a single
/// list; the mapper sorts out which is which by `identity_type`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityData {
    #[serde(rename = "type")]
    pub identity_type: String,
    /// How the entry was verified ("automatic", "manual"), if at all.
    #[serde(default)]
    pub verified: Option<String>,
    pub value: String,
}

/// An employment assignment at an org unit.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentData {
    /// Six-digit location code of the org unit.
    pub location_code: String,
    /// "academic" or "administrative".
    pub job_category: String,
    /// Whether this is the person's primary assignment.
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// A non-employment role tied to an org unit.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleData {
    #[serde(rename = "type")]
    pub role_type: String,
    pub location_code: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// A complete feed document for one employee.
#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeBundle {
    #[serde(flatten)]
    pub employee: EmployeeData,
    #[serde(default)]
    pub assignments: Vec<AssignmentData>,
    #[serde(default)]
    pub roles: Vec<RoleData>,
}

impl EmployeeBundle {
    /// A bundle that represents "person gone from the source".
    pub fn tombstone(person_id: impl Into<String>) -> Self {
        Self {
            employee: EmployeeData {
                person_id: person_id.into(),
                ..Default::default()
            },
            assignments: Vec::new(),
            roles: Vec::new(),
        }
    }

    /// True when the document carries nothing but the person key.
    pub fn is_tombstone(&self) -> bool {
        self.employee.first_name.is_none()
            && self.employee.last_name.is_none()
            && self.employee.identities.is_empty()
            && self.assignments.is_empty()
            && self.roles.is_empty()
    }
}

/// Parse a feed document.
pub fn parse_employee(data: &[u8]) -> HubResult<EmployeeBundle> {
    let bundle: EmployeeBundle = serde_json::from_slice(data)
        .map_err(|e| HubError::Datasource(format!("invalid employee document: {e}")))?;
    if bundle.employee.person_id.is_empty() {
        return Err(HubError::Datasource("missing person_id".into()));
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parse_full_document() {
        let doc = br#"{
            "person_id": "1001",
            "first_name": "Kari",
            "last_name": "Nordmann",
            "date_of_birth": "1985-06-15",
            "gender": "Kvinne",
            "registration_completed_date": "2026-01-10",
            "reserved": true,
            "identities": [
                {"type": "passport_number", "verified": "manual",
                 "value": "NO-X1234567"},
                {"type": "private_mobile", "verified": "automatic",
                 "value": "20123456"}
            ],
            "assignments": [
                {"location_code": "332211", "job_category": "academic",
                 "primary": true,
                 "start_date": "2026-01-01", "end_date": "2026-12-31"}
            ],
            "roles": [],
            "some_future_field": {"nested": true}
        }"#;

        let bundle = parse_employee(doc).unwrap();
        assert_eq!(bundle.employee.person_id, "1001");
        assert_eq!(bundle.employee.first_name.as_deref(), Some("Kari"));
        assert_eq!(
            bundle.employee.date_of_birth,
            NaiveDate::from_ymd_opt(1985, 6, 15)
        );
        assert!(bundle.employee.reserved);
        assert_eq!(bundle.employee.identities.len(), 2);
        assert_eq!(bundle.assignments.len(), 1);
        assert!(bundle.assignments[0].primary);
        assert!(!bundle.is_tombstone());
    }

    #[test]
    fn parse_tombstone_document() {
        let bundle = parse_employee(br#"{"person_id": "1001"}"#).unwrap();
        assert!(bundle.is_tombstone());
        assert_eq!(bundle.employee.person_id, "1001");
    }

    #[test]
    fn missing_person_id_is_an_error() {
        assert!(parse_employee(br#"{"first_name": "Kari"}"#).is_err());
        assert!(parse_employee(br#"{"person_id": ""}"#).is_err());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_employee(b"not json").is_err());
    }
}
