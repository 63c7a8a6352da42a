//! External identifiers attached to persons.

use serde::{Deserialize, Serialize};

/// Identifier namespaces recognized by the hub.
///
/// Ordering doubles as match priority: when reconciling an incoming
/// HR record against the database, candidates are looked up in this
/// order (see the import matcher).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExternalIdType {
    /// HR employee number.
    EmployeeNumber,
    /// National identity number.
    NationalIdNumber,
    /// Passport number, prefixed with issuing country.
    PassportNumber,
    /// The upstream system's own person key.
    SourcePersonId,
}

impl ExternalIdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExternalIdType::EmployeeNumber => "EMPLOYEE_NO",
            ExternalIdType::NationalIdNumber => "NATIONAL_ID",
            ExternalIdType::PassportNumber => "PASSPORT_NO",
            ExternalIdType::SourcePersonId => "SOURCE_PID",
        }
    }

    pub fn parse(s: &str) -> Option<ExternalIdType> {
        match s {
            "EMPLOYEE_NO" => Some(ExternalIdType::EmployeeNumber),
            "NATIONAL_ID" => Some(ExternalIdType::NationalIdNumber),
            "PASSPORT_NO" => Some(ExternalIdType::PassportNumber),
            "SOURCE_PID" => Some(ExternalIdType::SourcePersonId),
            _ => None,
        }
    }

    /// All id types in match-priority order.
    pub fn all() -> [ExternalIdType; 4] {
        [
            ExternalIdType::EmployeeNumber,
            ExternalIdType::NationalIdNumber,
            ExternalIdType::PassportNumber,
            ExternalIdType::SourcePersonId,
        ]
    }
}

/// An (id_type, value) pair from one source system.
///
/// `Ord`/`Hash` so that imports can diff sets of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExternalId {
    pub id_type: ExternalIdType,
    pub value: String,
}

impl ExternalId {
    pub fn new(id_type: ExternalIdType, value: impl Into<String>) -> Self {
        Self {
            id_type,
            value: value.into(),
        }
    }
}
