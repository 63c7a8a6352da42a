//! Contact information attached to persons.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContactType {
    WorkPhone,
    PrivateMobile,
    WorkEmail,
}

impl ContactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactType::WorkPhone => "WORK_PHONE",
            ContactType::PrivateMobile => "PRIVATE_MOBILE",
            ContactType::WorkEmail => "WORK_EMAIL",
        }
    }

    pub fn parse(s: &str) -> Option<ContactType> {
        match s {
            "WORK_PHONE" => Some(ContactType::WorkPhone),
            "PRIVATE_MOBILE" => Some(ContactType::PrivateMobile),
            "WORK_EMAIL" => Some(ContactType::WorkEmail),
            _ => None,
        }
    }
}

/// One contact entry from one source system.
///
/// `preference` orders entries of the same type; lower is preferred.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContactInfo {
    pub contact_type: ContactType,
    pub preference: u16,
    pub value: String,
}
