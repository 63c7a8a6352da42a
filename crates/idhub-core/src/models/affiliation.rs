//! Affiliations: a person's ties to organizational units.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Broad category of an affiliation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AffiliationKind {
    Employee,
    Associate,
    Student,
}

impl AffiliationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffiliationKind::Employee => "EMPLOYEE",
            AffiliationKind::Associate => "ASSOCIATE",
            AffiliationKind::Student => "STUDENT",
        }
    }

    pub fn parse(s: &str) -> Option<AffiliationKind> {
        match s {
            "EMPLOYEE" => Some(AffiliationKind::Employee),
            "ASSOCIATE" => Some(AffiliationKind::Associate),
            "STUDENT" => Some(AffiliationKind::Student),
            _ => None,
        }
    }
}

/// Fine-grained affiliation status within a kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AffiliationStatus {
    /// Employee in an academic position.
    Academic,
    /// Employee in a technical or administrative position.
    TechAdmin,
    Emeritus,
    GuestResearcher,
    ExternalPartner,
    ActiveStudent,
}

impl AffiliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffiliationStatus::Academic => "academic",
            AffiliationStatus::TechAdmin => "tech_adm",
            AffiliationStatus::Emeritus => "emeritus",
            AffiliationStatus::GuestResearcher => "guest_researcher",
            AffiliationStatus::ExternalPartner => "external_partner",
            AffiliationStatus::ActiveStudent => "active_student",
        }
    }

    pub fn parse(s: &str) -> Option<AffiliationStatus> {
        match s {
            "academic" => Some(AffiliationStatus::Academic),
            "tech_adm" => Some(AffiliationStatus::TechAdmin),
            "emeritus" => Some(AffiliationStatus::Emeritus),
            "guest_researcher" => Some(AffiliationStatus::GuestResearcher),
            "external_partner" => Some(AffiliationStatus::ExternalPartner),
            "active_student" => Some(AffiliationStatus::ActiveStudent),
            _ => None,
        }
    }

    /// The kind this status belongs under.
    pub fn kind(&self) -> AffiliationKind {
        match self {
            AffiliationStatus::Academic | AffiliationStatus::TechAdmin => {
                AffiliationKind::Employee
            }
            AffiliationStatus::Emeritus
            | AffiliationStatus::GuestResearcher
            | AffiliationStatus::ExternalPartner => AffiliationKind::Associate,
            AffiliationStatus::ActiveStudent => AffiliationKind::Student,
        }
    }
}

/// A person's tie to an org unit, as asserted by one source system.
///
/// Unique per (person, ou, kind, status, source). `Ord`/`Hash` so the
/// import can diff the mapped set against the stored set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Affiliation {
    pub ou_id: Uuid,
    pub kind: AffiliationKind,
    pub status: AffiliationStatus,
    /// Lower sorts first when picking a primary affiliation.
    pub precedence: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_kind() {
        assert_eq!(
            AffiliationStatus::Academic.kind(),
            AffiliationKind::Employee
        );
        assert_eq!(
            AffiliationStatus::Emeritus.kind(),
            AffiliationKind::Associate
        );
        assert_eq!(
            AffiliationStatus::ActiveStudent.kind(),
            AffiliationKind::Student
        );
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            AffiliationStatus::Academic,
            AffiliationStatus::TechAdmin,
            AffiliationStatus::Emeritus,
            AffiliationStatus::GuestResearcher,
            AffiliationStatus::ExternalPartner,
            AffiliationStatus::ActiveStudent,
        ] {
            assert_eq!(AffiliationStatus::parse(status.as_str()), Some(status));
        }
    }
}
