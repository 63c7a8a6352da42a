//! SurrealDB implementation of [`TaskRepository`].
//!
//! Tasks are keyed by (queue, key). A push against an existing key
//! updates the task in place but keeps the original issued-at time,
//! so a task that keeps being re-pushed still records when it first
//! entered the queue. With `ignore_nbf_after`, a push that would move
//! an already-due retry further into the future is dropped instead.

use chrono::{DateTime, Utc};
use idhub_core::error::HubResult;
use idhub_core::models::task::{NewTask, Task};
use idhub_core::repository::{TaskFilter, TaskRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct TaskRow {
    queue: String,
    key: String,
    iat: DateTime<Utc>,
    nbf: DateTime<Utc>,
    attempts: u32,
    reason: Option<String>,
    payload: Option<serde_json::Value>,
}

impl TaskRow {
    fn into_task(self) -> Task {
        Task {
            queue: self.queue,
            key: self.key,
            iat: self.iat,
            nbf: self.nbf,
            attempts: self.attempts,
            reason: self.reason,
            payload: self.payload,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct QueueCountRow {
    queue: String,
    total: u64,
}

/// Build the WHERE clause for a task filter. Callers bind the
/// matching parameters themselves.
fn filter_clause(filter: &TaskFilter) -> String {
    let mut conditions = Vec::new();
    if !filter.queues.is_empty() {
        conditions.push("queue IN $queues");
    }
    if filter.nbf_before.is_some() {
        conditions.push("nbf < $nbf_before");
    }
    if filter.max_attempts.is_some() {
        conditions.push("attempts < $max_attempts");
    }
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

/// SurrealDB implementation of the task queue repository.
#[derive(Clone)]
pub struct SurrealTaskRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTaskRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, queue: &str, key: &str) -> Result<Option<Task>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT queue, key, iat, nbf, attempts, reason, payload \
                 FROM task_queue WHERE queue = $queue AND key = $key",
            )
            .bind(("queue", queue.to_string()))
            .bind(("key", key.to_string()))
            .await?;

        let rows: Vec<TaskRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(TaskRow::into_task))
    }
}

impl<C: Connection> TaskRepository for SurrealTaskRepository<C> {
    async fn push(&self, task: NewTask, ignore_nbf_after: bool) -> HubResult<Option<Task>> {
        let now = Utc::now();
        let nbf = task.nbf.unwrap_or(now);

        let existing = self.fetch(&task.queue, &task.key).await?;

        match existing {
            Some(current) => {
                // An already-queued task due earlier must not be
                // postponed by a reschedule push.
                if ignore_nbf_after && current.nbf <= nbf {
                    return Ok(None);
                }

                let attempts = task.attempts.unwrap_or(current.attempts);
                self.db
                    .query(
                        "UPDATE task_queue SET \
                         nbf = $nbf, attempts = $attempts, \
                         reason = $reason, payload = $payload \
                         WHERE queue = $queue AND key = $key",
                    )
                    .bind(("queue", task.queue.clone()))
                    .bind(("key", task.key.clone()))
                    .bind(("nbf", nbf))
                    .bind(("attempts", attempts))
                    .bind(("reason", task.reason.clone()))
                    .bind(("payload", task.payload.clone()))
                    .await
                    .map_err(DbError::from)?
                    .check()
                    .map_err(|e| DbError::Decode(e.to_string()))?;

                Ok(Some(Task {
                    queue: task.queue,
                    key: task.key,
                    iat: current.iat,
                    nbf,
                    attempts,
                    reason: task.reason,
                    payload: task.payload,
                }))
            }
            None => {
                let attempts = task.attempts.unwrap_or(0);
                self.db
                    .query(
                        "CREATE task_queue SET \
                         queue = $queue, key = $key, \
                         iat = $iat, nbf = $nbf, attempts = $attempts, \
                         reason = $reason, payload = $payload",
                    )
                    .bind(("queue", task.queue.clone()))
                    .bind(("key", task.key.clone()))
                    .bind(("iat", now))
                    .bind(("nbf", nbf))
                    .bind(("attempts", attempts))
                    .bind(("reason", task.reason.clone()))
                    .bind(("payload", task.payload.clone()))
                    .await
                    .map_err(DbError::from)?
                    .check()
                    .map_err(|e| DbError::Decode(e.to_string()))?;

                Ok(Some(Task {
                    queue: task.queue,
                    key: task.key,
                    iat: now,
                    nbf,
                    attempts,
                    reason: task.reason,
                    payload: task.payload,
                }))
            }
        }
    }

    async fn get(&self, queue: &str, key: &str) -> HubResult<Option<Task>> {
        Ok(self.fetch(queue, key).await?)
    }

    async fn pop(&self, queue: &str, key: &str) -> HubResult<Task> {
        let task = self
            .fetch(queue, key)
            .await?
            .ok_or_else(|| DbError::NotFound {
                entity: "task".into(),
                id: format!("{queue}/{key}"),
            })?;

        self.db
            .query("DELETE task_queue WHERE queue = $queue AND key = $key")
            .bind(("queue", queue.to_string()))
            .bind(("key", key.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(task)
    }

    async fn pop_next(&self, filter: &TaskFilter) -> HubResult<Option<Task>> {
        let clause = filter_clause(filter);
        let query = format!(
            "SELECT queue, key, iat, nbf, attempts, reason, payload \
             FROM task_queue {clause} \
             ORDER BY queue ASC, nbf ASC, iat ASC LIMIT 1"
        );

        let mut builder = self.db.query(&query);
        if !filter.queues.is_empty() {
            builder = builder.bind(("queues", filter.queues.clone()));
        }
        if let Some(nbf_before) = filter.nbf_before {
            builder = builder.bind(("nbf_before", nbf_before));
        }
        if let Some(max_attempts) = filter.max_attempts {
            builder = builder.bind(("max_attempts", max_attempts));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<TaskRow> = result.take(0).map_err(DbError::from)?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        self.db
            .query("DELETE task_queue WHERE queue = $queue AND key = $key")
            .bind(("queue", row.queue.clone()))
            .bind(("key", row.key.clone()))
            .await
            .map_err(DbError::from)?;

        Ok(Some(row.into_task()))
    }

    async fn search(&self, filter: &TaskFilter) -> HubResult<Vec<Task>> {
        let clause = filter_clause(filter);
        let query = format!(
            "SELECT queue, key, iat, nbf, attempts, reason, payload \
             FROM task_queue {clause} \
             ORDER BY queue ASC, nbf ASC, iat ASC"
        );

        let mut builder = self.db.query(&query);
        if !filter.queues.is_empty() {
            builder = builder.bind(("queues", filter.queues.clone()));
        }
        if let Some(nbf_before) = filter.nbf_before {
            builder = builder.bind(("nbf_before", nbf_before));
        }
        if let Some(max_attempts) = filter.max_attempts {
            builder = builder.bind(("max_attempts", max_attempts));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<TaskRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows.into_iter().map(TaskRow::into_task).collect())
    }

    async fn queue_counts(&self) -> HubResult<Vec<(String, u64)>> {
        let mut result = self
            .db
            .query(
                "SELECT queue, count() AS total FROM task_queue \
                 GROUP BY queue ORDER BY queue ASC",
            )
            .await
            .map_err(DbError::from)?;

        let rows: Vec<QueueCountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().map(|r| (r.queue, r.total)).collect())
    }
}
