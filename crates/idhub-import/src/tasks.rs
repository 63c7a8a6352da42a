//! Processing of deferred import tasks.
//!
//! The importer pushes a task whenever a record's active state
//! changes on a future date. This module drains those tasks once they
//! are due: fetch the current source data for the task's key and run
//! it through the importer again. Failures are re-pushed with a fixed
//! delay until the attempt cap is reached.

use chrono::{TimeDelta, Utc};
use idhub_core::error::HubResult;
use idhub_core::models::task::NewTask;
use idhub_core::repository::{
    AuditLogRepository, GroupRepository, OrgUnitRepository, PersonRepository, TaskFilter,
    TaskRepository,
};
use tracing::{info, warn};

use crate::datasource::EmployeeBundle;
use crate::importer::EmployeeImporter;

/// Where task processing gets fresh source data from.
pub trait RecordSource: Send + Sync {
    /// Fetch the current feed document for one person key. `None`
    /// means the person is gone from the source.
    fn fetch(
        &self,
        hr_id: &str,
    ) -> impl Future<Output = HubResult<Option<EmployeeBundle>>> + Send;
}

/// Queue processing knobs.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub queue: String,
    /// Tasks with this many failed attempts are left alone.
    pub max_attempts: u32,
    /// Delay before a failed task is retried.
    pub retry_delay: TimeDelta,
    /// Stop after this many tasks, if set.
    pub limit: Option<usize>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            queue: "hr-import".into(),
            max_attempts: 20,
            retry_delay: TimeDelta::hours(1),
            limit: None,
        }
    }
}

/// Counters from one queue run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub processed: usize,
    pub failed: usize,
}

/// Drain due tasks from the queue.
///
/// Tasks are popped one at a time in (nbf, iat) order. A task that
/// fails is pushed back with `attempts + 1` and the error message as
/// its reason; once it hits the attempt cap it stays queued for
/// monitoring but is never popped again.
pub async fn process_queue<P, O, G, A, T, S>(
    importer: &EmployeeImporter<P, O, G, A, T>,
    tasks: &T,
    source: &S,
    options: &QueueOptions,
) -> HubResult<QueueStats>
where
    P: PersonRepository,
    O: OrgUnitRepository,
    G: GroupRepository,
    A: AuditLogRepository,
    T: TaskRepository,
    S: RecordSource,
{
    let filter = TaskFilter {
        queues: vec![options.queue.clone()],
        nbf_before: Some(Utc::now()),
        max_attempts: Some(options.max_attempts),
    };

    let mut stats = QueueStats::default();

    while options.limit.is_none_or(|limit| stats.processed < limit) {
        let Some(task) = tasks.pop_next(&filter).await? else {
            break;
        };
        stats.processed += 1;

        let bundle = match source.fetch(&task.key).await {
            // Gone from the source: run the tombstone through the
            // importer so HR data gets cleared.
            Ok(None) => EmployeeBundle::tombstone(task.key.clone()),
            Ok(Some(bundle)) => bundle,
            Err(err) => {
                warn!(key = %task.key, error = %err, "failed to fetch source data");
                requeue(tasks, &options.queue, &task.key, task.attempts, options, &err)
                    .await?;
                stats.failed += 1;
                continue;
            }
        };

        match importer.handle_employee(&bundle).await {
            Ok(outcome) => {
                info!(
                    key = %task.key,
                    action = ?outcome.action,
                    "processed deferred import"
                );
            }
            Err(err) => {
                warn!(key = %task.key, error = %err, "deferred import failed");
                requeue(tasks, &options.queue, &task.key, task.attempts, options, &err)
                    .await?;
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

async fn requeue<T: TaskRepository>(
    tasks: &T,
    queue: &str,
    key: &str,
    attempts: u32,
    options: &QueueOptions,
    err: &idhub_core::HubError,
) -> HubResult<()> {
    let task = NewTask::new(queue, key)
        .with_nbf(Utc::now() + options.retry_delay)
        .with_attempts(attempts + 1)
        .with_reason(err.to_string());
    tasks.push(task, false).await?;
    Ok(())
}
