//! Source system identifiers.

use serde::{Deserialize, Serialize};

/// Upstream system a piece of person data originates from.
///
/// Every source-scoped record (external id, affiliation, contact
/// info) is tagged with one of these, and imports only add or remove
/// rows belonging to their own source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceSystem {
    /// The HR system (employee master data).
    Hr,
    /// The student information system.
    StudentRegistry,
    /// Manually registered data.
    Manual,
}

impl SourceSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSystem::Hr => "HR",
            SourceSystem::StudentRegistry => "FS",
            SourceSystem::Manual => "MANUAL",
        }
    }

    pub fn parse(s: &str) -> Option<SourceSystem> {
        match s {
            "HR" => Some(SourceSystem::Hr),
            "FS" => Some(SourceSystem::StudentRegistry),
            "MANUAL" => Some(SourceSystem::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_system_string_round_trip() {
        for src in [
            SourceSystem::Hr,
            SourceSystem::StudentRegistry,
            SourceSystem::Manual,
        ] {
            assert_eq!(SourceSystem::parse(src.as_str()), Some(src));
        }
        assert_eq!(SourceSystem::parse("bogus"), None);
    }
}
