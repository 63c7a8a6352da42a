//! Queued work items with not-before semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task waiting in a named queue.
///
/// `key` is unique within its queue. `nbf` (not-before) is the
/// earliest time the task may be processed; a record that is not yet
/// valid upstream gets rescheduled by pushing a task whose `nbf` is
/// the date it becomes valid. `attempts` counts failed processing
/// runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub queue: String,
    pub key: String,
    /// Issued-at: when the task was first queued.
    pub iat: DateTime<Utc>,
    /// Not-before: do not process until this time.
    pub nbf: DateTime<Utc>,
    pub attempts: u32,
    /// Human-readable description, e.g. the last error message.
    pub reason: Option<String>,
    pub payload: Option<serde_json::Value>,
}

/// Fields for pushing a task; `iat`/`nbf` default to now.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewTask {
    pub queue: String,
    pub key: String,
    pub nbf: Option<DateTime<Utc>>,
    pub attempts: Option<u32>,
    pub reason: Option<String>,
    pub payload: Option<serde_json::Value>,
}

impl NewTask {
    pub fn new(queue: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_nbf(mut self, nbf: DateTime<Utc>) -> Self {
        self.nbf = Some(nbf);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }
}
