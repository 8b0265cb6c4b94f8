//! Row structs for the `tasks` / `task_events` tables, and their `From` conversions
//! to/from the domain types in `task-engine-core`.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use task_engine_core::{Task, TaskEvent, TaskStatus};
use uuid::Uuid;

use crate::schema::{task_events, tasks};

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
pub struct TaskRecord {
    pub task_id: String,
    pub task_type: String,
    pub status: String,
    pub data: Value,
    pub handler_url: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.task_id.clone(),
            task_type: task.task_type.clone(),
            status: task.status.to_string(),
            data: task.data.clone(),
            handler_url: task.handler_url.clone(),
            retry_count: task.retry_count as i32,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Self {
            task_id: record.task_id,
            task_type: record.task_type,
            data: record.data,
            status: status_from_str(&record.status),
            retry_count: record.retry_count.max(0) as u32,
            created_at: record.created_at,
            updated_at: record.updated_at,
            handler_url: record.handler_url,
        }
    }
}

fn status_from_str(status: &str) -> TaskStatus {
    match status {
        "PENDING" => TaskStatus::Pending,
        "IN_PROGRESS" => TaskStatus::InProgress,
        "COMPLETED" => TaskStatus::Completed,
        "FAILED" => TaskStatus::Failed,
        "DEAD_LETTER" => TaskStatus::DeadLetter,
        other => {
            tracing::warn!(status = other, "unrecognized task status in store, treating as FAILED");
            TaskStatus::Failed
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = task_events)]
pub struct TaskEventRecord {
    pub event_id: String,
    pub task_id: String,
    pub event_type: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl TaskEventRecord {
    pub fn from_domain(event: &TaskEvent) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            task_id: event.task_id.clone(),
            event_type: event.event_type.to_string(),
            metadata: serde_json::to_value(&event.metadata).unwrap_or(Value::Null),
            created_at: event.timestamp,
        }
    }
}
