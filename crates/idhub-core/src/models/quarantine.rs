//! Quarantines: blocks placed on persons or accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum QuarantineType {
    /// Set automatically when a person loses all source-system ties.
    AutoInactive,
    /// Set by an operator.
    Manual,
}

impl QuarantineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuarantineType::AutoInactive => "auto_inactive",
            QuarantineType::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<QuarantineType> {
        match s {
            "auto_inactive" => Some(QuarantineType::AutoInactive),
            "manual" => Some(QuarantineType::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quarantine {
    pub quarantine_type: QuarantineType,
    pub reason: String,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
}

impl Quarantine {
    /// A quarantine is in effect once started and until ended.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.start_at <= now && self.end_at.is_none_or(|end| end > now)
    }
}
