//! Background task dispatch for organizer notifications.
//!
//! # Responsibility
//! - Define the task envelope and the confirmation-email payload.
//! - Provide a durable SQLite queue and an in-memory queue behind one
//!   dispatcher trait.
//!
//! # Invariants
//! - Enqueue is append-only; a task is never rewritten after enqueue.
//! - `pending` returns tasks in enqueue order.
//! - Callers treat enqueue as best-effort; nothing in core depends on a task
//!   being delivered.

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task type name for organizer confirmation emails.
pub const SEND_CONFIRMATION_EMAIL: &str = "send_confirmation_email";

/// Task dispatch/queue failures.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("task payload encoding failure: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("invalid task id `{0}`")]
    InvalidTaskId(String),
}

/// Payload of a `send_confirmation_email` task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationEmail {
    pub email: String,
    pub conference_info: String,
}

/// One queued unit of background work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub task_type: String,
    pub payload: serde_json::Value,
}

impl Task {
    pub fn new(task_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type: task_type.into(),
            payload,
        }
    }

    /// Builds a confirmation-email task.
    pub fn confirmation_email(payload: &ConfirmationEmail) -> Result<Self, TaskError> {
        Ok(Self::new(SEND_CONFIRMATION_EMAIL, serde_json::to_value(payload)?))
    }
}

/// Fire-and-forget task sink.
pub trait TaskDispatcher {
    fn enqueue(&self, task: &Task) -> Result<(), TaskError>;
}

/// Durable queue stored in the `tasks` table.
pub struct SqliteTaskQueue<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskQueue<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Lists not-yet-completed tasks in enqueue order.
    pub fn pending(&self, limit: u32) -> Result<Vec<Task>, TaskError> {
        let mut stmt = self.conn.prepare(
            "SELECT task_id, task_type, payload
             FROM tasks
             WHERE completed_at IS NULL
             ORDER BY enqueued_at ASC, rowid ASC
             LIMIT ?1;",
        )?;
        let mut rows = stmt.query([limit])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get(0)?;
            let payload_text: String = row.get(2)?;
            tasks.push(Task {
                id: Uuid::parse_str(&id_text).map_err(|_| TaskError::InvalidTaskId(id_text.clone()))?,
                task_type: row.get(1)?,
                payload: serde_json::from_str(&payload_text)?,
            });
        }
        Ok(tasks)
    }

    /// Marks one task done. Returns `false` when it was unknown or already done.
    pub fn complete(&self, task_id: Uuid) -> Result<bool, TaskError> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET completed_at = (strftime('%s', 'now') * 1000)
             WHERE task_id = ?1 AND completed_at IS NULL;",
            [task_id.to_string()],
        )?;
        Ok(changed == 1)
    }
}

impl TaskDispatcher for SqliteTaskQueue<'_> {
    fn enqueue(&self, task: &Task) -> Result<(), TaskError> {
        self.conn.execute(
            "INSERT INTO tasks (task_id, task_type, payload) VALUES (?1, ?2, ?3);",
            params![
                task.id.to_string(),
                task.task_type.as_str(),
                serde_json::to_string(&task.payload)?,
            ],
        )?;
        Ok(())
    }
}

/// Process-local queue, drained by the caller.
#[derive(Debug, Default)]
pub struct InMemoryTaskQueue {
    tasks: Mutex<Vec<Task>>,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every queued task.
    pub fn drain(&self) -> Vec<Task> {
        std::mem::take(&mut *self.tasks.lock())
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }
}

impl TaskDispatcher for InMemoryTaskQueue {
    fn enqueue(&self, task: &Task) -> Result<(), TaskError> {
        self.tasks.lock().push(task.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_db_in_memory;

    fn confirmation() -> Task {
        Task::confirmation_email(&ConfirmationEmail {
            email: "org@example.com".to_string(),
            conference_info: "RustConf".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn confirmation_payload_uses_camel_case() {
        let task = confirmation();
        assert_eq!(task.task_type, SEND_CONFIRMATION_EMAIL);
        assert_eq!(task.payload["conferenceInfo"], "RustConf");
        assert_eq!(task.payload["email"], "org@example.com");
    }

    #[test]
    fn sqlite_queue_lists_pending_until_completed() {
        let conn = open_db_in_memory().unwrap();
        let queue = SqliteTaskQueue::new(&conn);
        let first = confirmation();
        let second = confirmation();
        queue.enqueue(&first).unwrap();
        queue.enqueue(&second).unwrap();

        let pending = queue.pending(10).unwrap();
        assert_eq!(pending, vec![first.clone(), second.clone()]);

        assert!(queue.complete(first.id).unwrap());
        assert!(!queue.complete(first.id).unwrap());
        assert_eq!(queue.pending(10).unwrap(), vec![second]);
    }

    #[test]
    fn in_memory_queue_drains_in_order() {
        let queue = InMemoryTaskQueue::new();
        let task = confirmation();
        queue.enqueue(&task).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain(), vec![task]);
        assert!(queue.is_empty());
    }
}
