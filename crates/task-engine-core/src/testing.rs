//! In-memory fakes for the port traits, so downstream tests don't need Postgres or Redis
//! running.
//!
//! A `std::sync::Mutex`-guarded `Vec`/`HashMap` behind the real trait, kept in this crate
//! (behind the `testing` feature) rather than duplicated by every consumer.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{EngineError, EngineResult};
use crate::model::{Task, TaskEvent, TaskStatus};
use crate::ports::{Clock, DlqSink, EventSink, Page, TaskStore};

/// `TaskStore` backed by a `Mutex<HashMap<String, Task>>`.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn paginate(mut tasks: Vec<Task>, page: Page) -> Vec<Task> {
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let start = (page.offset as usize).min(tasks.len());
        let end = if page.limit == 0 {
            tasks.len()
        } else {
            (start + page.limit as usize).min(tasks.len())
        };
        tasks.drain(start..end).collect()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save(&self, task: &Task) -> EngineResult<()> {
        self.tasks
            .lock()
            .unwrap()
            .insert(task.task_id.clone(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, task_id: &str) -> EngineResult<Option<Task>> {
        Ok(self.tasks.lock().unwrap().get(task_id).cloned())
    }

    async fn find_by_status(&self, status: TaskStatus, page: Page) -> EngineResult<Vec<Task>> {
        let matching: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == status)
            .cloned()
            .collect();
        Ok(Self::paginate(matching, page))
    }

    async fn find_by_type(&self, task_type: &str, page: Page) -> EngineResult<Vec<Task>> {
        let matching: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.task_type == task_type)
            .cloned()
            .collect();
        Ok(Self::paginate(matching, page))
    }

    async fn find_by_type_and_status(
        &self,
        task_type: &str,
        status: TaskStatus,
        page: Page,
    ) -> EngineResult<Vec<Task>> {
        let matching: Vec<Task> = self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.task_type == task_type && t.status == status)
            .cloned()
            .collect();
        Ok(Self::paginate(matching, page))
    }

    async fn find_failed_for_retry(&self, max_retries: u32) -> EngineResult<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == TaskStatus::Failed && t.retry_count <= max_retries)
            .cloned()
            .collect())
    }

    async fn find_stuck(&self, threshold: DateTime<Utc>) -> EngineResult<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.status == TaskStatus::InProgress && t.updated_at < threshold)
            .cloned()
            .collect())
    }

    async fn update_status(&self, task_id: &str, status: TaskStatus) -> EngineResult<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| EngineError::NotFound(task_id.to_string()))?;
        task.transition_to(status);
        Ok(())
    }

    async fn increment_retry(&self, task_id: &str) -> EngineResult<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| EngineError::NotFound(task_id.to_string()))?;
        task.retry_count += 1;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_completed_older_than(&self, threshold: DateTime<Utc>) -> EngineResult<u64> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|_, t| !(t.status == TaskStatus::Completed && t.updated_at < threshold));
        Ok((before - tasks.len()) as u64)
    }
}

/// `EventSink` that records every event it receives, or always fails if constructed via
/// [`InMemoryEventSink::failing`].
#[derive(Default)]
pub struct InMemoryEventSink {
    events: Mutex<Vec<TaskEvent>>,
    always_fail: bool,
}

impl InMemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            always_fail: true,
        }
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn send(&self, _topic: &str, _key: &str, event: &TaskEvent) -> EngineResult<()> {
        if self.always_fail {
            return Err(EngineError::SinkError("simulated sink failure".into()));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// `DlqSink` that records every task it receives.
#[derive(Default)]
pub struct InMemoryDlqSink {
    tasks: Mutex<Vec<Task>>,
    always_fail: bool,
}

impl InMemoryDlqSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            always_fail: true,
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl DlqSink for InMemoryDlqSink {
    async fn send(&self, _topic: &str, _key: &str, task: &Task) -> EngineResult<()> {
        if self.always_fail {
            return Err(EngineError::SinkError("simulated DLQ sink failure".into()));
        }
        self.tasks.lock().unwrap().push(task.clone());
        Ok(())
    }
}

/// Fixed or steppable clock for deterministic retry-timing assertions.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn in_memory_store_round_trips() {
        let store = InMemoryTaskStore::new();
        let task = Task::new("t1", "SUCCESS", json!({}));
        store.save(&task).await.unwrap();
        let found = store.find_by_id("t1").await.unwrap().unwrap();
        assert_eq!(found.task_id, "t1");
    }

    #[tokio::test]
    async fn in_memory_store_find_stuck_filters_by_status_and_age() {
        let store = InMemoryTaskStore::new();
        let mut stuck = Task::new("stuck", "SUCCESS", json!({}));
        stuck.transition_to(TaskStatus::InProgress);
        stuck.updated_at = Utc::now() - chrono::Duration::hours(1);
        store.save(&stuck).await.unwrap();

        let mut fresh = Task::new("fresh", "SUCCESS", json!({}));
        fresh.transition_to(TaskStatus::InProgress);
        store.save(&fresh).await.unwrap();

        let threshold = Utc::now() - chrono::Duration::minutes(5);
        let found = store.find_stuck(threshold).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].task_id, "stuck");
    }

    #[tokio::test]
    async fn failing_event_sink_always_errors() {
        let sink = InMemoryEventSink::failing();
        let event = TaskEvent::new(
            "t1",
            "SUCCESS",
            crate::model::EventType::TaskCompleted,
            HashMap::new(),
            Utc::now(),
        );
        let err = sink.send("topic", "t1", &event).await.unwrap_err();
        assert!(matches!(err, EngineError::SinkError(_)));
    }
}
