//! # Task Data Model
//!
//! The primary data types that flow through the execution pipeline: [`Task`], the unit of
//! work a host submits; [`TaskResult`], the tagged outcome a handler produces; and
//! [`TaskEvent`], the immutable audit record the engine publishes at each lifecycle
//! transition.
//!
//! ## Persistence representation
//!
//! `Task::data` is kept as a [`serde_json::Value`] end to end, never re-encoded as a JSON
//! string, so a store backed by a JSON column can decode it lazily at the domain boundary
//! instead of paying a double-serialization cost on every read.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current disposition of a [`Task`] within the lifecycle state machine.
///
/// Transitions are constrained to `PENDING -> IN_PROGRESS -> {COMPLETED, FAILED,
/// DEAD_LETTER}`; `FAILED` and `DEAD_LETTER` may re-enter `PENDING` only via an explicit
/// admin retry ([`crate::dead_letter::recover_from_dead_letter`] for the dead-letter case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    DeadLetter,
}

impl TaskStatus {
    /// `COMPLETED` and `DEAD_LETTER` are terminal for normal execution; nothing the engine
    /// does moves a task out of either status without an explicit admin action.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::DeadLetter)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::DeadLetter => "DEAD_LETTER",
        };
        f.write_str(s)
    }
}

/// The unit of work the engine routes to a registered handler.
///
/// `handler_url` is reserved for hosts that dispatch to out-of-process handlers; the
/// in-process [`crate::registry::HandlerRegistry`] ignores it, but it round-trips through
/// persistence so it is never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub data: Value,
    pub status: TaskStatus,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_url: Option<String>,
}

impl Task {
    /// Create a new task in `PENDING` status with `retry_count = 0`.
    pub fn new(task_id: impl Into<String>, task_type: impl Into<String>, data: Value) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.into(),
            task_type: task_type.into(),
            data,
            status: TaskStatus::Pending,
            retry_count: 0,
            created_at: now,
            updated_at: now,
            handler_url: None,
        }
    }

    /// Transition to a new status, refreshing `updated_at`. Does not validate the
    /// transition is legal; callers (the engine, the dead-letter processor, admin flows)
    /// are expected to only ever request legal transitions.
    pub fn transition_to(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn with_handler_url(mut self, handler_url: impl Into<String>) -> Self {
        self.handler_url = Some(handler_url.into());
        self
    }
}

/// Tagged outcome produced by a handler run.
///
/// A two-arm sum type matched exhaustively at settle time (see [`crate::engine`]); there is
/// deliberately no `Other`/wildcard variant, so an exhaustive `match` at the settle site
/// fails to compile if a new variant is ever added without updating that site too.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskResult {
    Success {
        task_id: String,
        result: HashMap<String, Value>,
    },
    Failure {
        task_id: String,
        error: String,
        retryable: bool,
    },
}

impl TaskResult {
    pub fn task_id(&self) -> &str {
        match self {
            TaskResult::Success { task_id, .. } => task_id,
            TaskResult::Failure { task_id, .. } => task_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success { .. })
    }
}

/// The full set of lifecycle events the engine and its collaborators may produce.
///
/// `RECOVERED_FROM_DLQ` is reserved for the admin recovery flow
/// ([`crate::dead_letter::recover_from_dead_letter`]); the automatic pipeline never emits
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    TaskCreated,
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    RetryAttempted,
    MovedToDlq,
    RecoveredFromDlq,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::TaskCreated => "TASK_CREATED",
            EventType::TaskStarted => "TASK_STARTED",
            EventType::TaskCompleted => "TASK_COMPLETED",
            EventType::TaskFailed => "TASK_FAILED",
            EventType::RetryAttempted => "RETRY_ATTEMPTED",
            EventType::MovedToDlq => "MOVED_TO_DLQ",
            EventType::RecoveredFromDlq => "RECOVERED_FROM_DLQ",
        };
        f.write_str(s)
    }
}

/// Immutable audit record. Once published, the engine never mutates or re-reads it; event
/// ownership passes to the store as soon as the sink acknowledges the send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub task_id: String,
    pub task_type: String,
    pub event_type: EventType,
    pub metadata: HashMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl TaskEvent {
    pub fn new(
        task_id: impl Into<String>,
        task_type: impl Into<String>,
        event_type: EventType,
        metadata: HashMap<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            task_type: task_type.into(),
            event_type,
            metadata,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_starts_pending_with_zero_retries() {
        let task = Task::new("t1", "SUCCESS", serde_json::json!({"ok": true}));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.retry_count, 0);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn transition_refreshes_updated_at() {
        let mut task = Task::new("t1", "SUCCESS", Value::Null);
        let created = task.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        task.transition_to(TaskStatus::InProgress);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.updated_at >= created);
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::DeadLetter.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(!TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn task_result_serializes_with_outcome_tag() {
        let success = TaskResult::Success {
            task_id: "t1".into(),
            result: HashMap::new(),
        };
        let json = serde_json::to_value(&success).unwrap();
        assert_eq!(json["outcome"], "success");
    }

    #[test]
    fn event_type_display_matches_schema_strings() {
        assert_eq!(EventType::MovedToDlq.to_string(), "MOVED_TO_DLQ");
        assert_eq!(EventType::RecoveredFromDlq.to_string(), "RECOVERED_FROM_DLQ");
    }
}
