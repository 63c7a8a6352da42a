//! TOML configuration for the batch CLI.

use std::path::{Path, PathBuf};

use idhub_core::error::{HubError, HubResult};
use idhub_db::DbConfig;
use serde::Deserialize;

/// Top-level configuration file.
///
/// Every section and field has a default, so an empty file (or no
/// file at all) yields a working local setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub db: DbConfig,
    pub import: ImportSettings,
    pub export: ExportSettings,
}

/// `[import]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Task queue used for deferred re-imports.
    pub queue: String,
    /// Group holding persons reserved from publication.
    pub reservation_group: String,
    /// Actor name written to the audit log.
    pub actor: String,
    /// Failed tasks with this many attempts are left alone.
    pub max_attempts: u32,
    /// Minutes before a failed task is retried.
    pub retry_delay_minutes: i64,
    /// Source snapshot used by `queue run` when `--file` is omitted.
    pub snapshot: Option<PathBuf>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            queue: "hr-import".into(),
            reservation_group: "hr-reservations".into(),
            actor: "hr-import".into(),
            max_attempts: 20,
            retry_delay_minutes: 60,
            snapshot: None,
        }
    }
}

/// `[export]` section. Output paths used when `--out` is omitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub persons_out: PathBuf,
    pub groups_out: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            persons_out: PathBuf::from("persons.txt"),
            groups_out: PathBuf::from("groups.txt"),
        }
    }
}

impl HubConfig {
    /// Load configuration, falling back to defaults when no path is
    /// given.
    pub fn load(path: Option<&Path>) -> HubResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HubError::Internal(format!("cannot read config {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            HubError::Validation {
                message: format!("bad config {}: {e}", path.display()),
            }
        })
    }
}
