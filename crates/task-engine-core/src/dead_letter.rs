//! Finalises tasks the execution pipeline gives up on, and the supplemental admin
//! recovery path back out of `DEAD_LETTER`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::error;

use crate::error::{EngineError, EngineResult};
use crate::events::EventPublisher;
use crate::model::{EventType, Task, TaskEvent, TaskStatus};
use crate::ports::{DlqSink, TaskStore};

/// Consumes a `(task, cause)` pair whose execution produced a non-retryable terminal
/// failure: persists `DEAD_LETTER`, emits `MOVED_TO_DLQ`, forwards the payload to the DLQ
/// sink. The latter two steps are best-effort and never undo the persisted status.
pub struct DeadLetterProcessor {
    store: Arc<dyn TaskStore>,
    events: EventPublisher,
    dlq_sink: Arc<dyn DlqSink>,
    dlq_topic: String,
}

impl DeadLetterProcessor {
    pub fn new(
        store: Arc<dyn TaskStore>,
        events_sink: Arc<dyn crate::ports::EventSink>,
        dlq_sink: Arc<dyn DlqSink>,
        dlq_topic: impl Into<String>,
    ) -> Self {
        Self {
            store,
            events: EventPublisher::new(events_sink, "events".to_string()),
            dlq_sink,
            dlq_topic: dlq_topic.into(),
        }
    }

    /// `task` is already carrying its final `retry_count`; this only transitions status.
    /// Idempotent: a task already in `DEAD_LETTER` is persisted again harmlessly (only
    /// `updated_at` moves).
    pub async fn process(&self, task: &mut Task, error_message: &str) {
        task.transition_to(TaskStatus::DeadLetter);
        if let Err(err) = self.store.save(task).await {
            error!(task_id = %task.task_id, error = %err, "failed to persist DEAD_LETTER status");
            return;
        }

        let stack_trace = format!("error: {error_message}");
        self.events
            .publish(&TaskEvent::new(
                task.task_id.clone(),
                task.task_type.clone(),
                EventType::MovedToDlq,
                HashMap::from([
                    ("taskType".to_string(), json!(task.task_type)),
                    ("retryCount".to_string(), json!(task.retry_count)),
                    ("errorType".to_string(), json!("HandlerError")),
                    ("errorMessage".to_string(), json!(error_message)),
                    ("stackTrace".to_string(), json!(stack_trace)),
                    ("timestamp".to_string(), json!(Utc::now())),
                ]),
                Utc::now(),
            ))
            .await;

        if let Err(err) = self.dlq_sink.send(&self.dlq_topic, &task.task_id, task).await {
            error!(task_id = %task.task_id, error = %err, "failed to forward task to DLQ sink, dropping");
        }
    }
}

/// Moves a `DEAD_LETTER` task back to `PENDING`. Not invoked by the automatic pipeline;
/// this is the explicit admin retry the lifecycle invariant permits. `RECOVERED_FROM_DLQ`
/// is only ever emitted from here.
pub async fn recover_from_dead_letter(
    store: &dyn TaskStore,
    events: &EventPublisher,
    task_id: &str,
) -> EngineResult<Task> {
    let mut task = store
        .find_by_id(task_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(task_id.to_string()))?;

    if task.status != TaskStatus::DeadLetter {
        return Err(EngineError::InvalidArgument(format!(
            "task {task_id} is not in DEAD_LETTER (current status: {})",
            task.status
        )));
    }

    let previous_retry_count = task.retry_count;
    task.transition_to(TaskStatus::Pending);
    store.save(&task).await?;

    events
        .publish(&TaskEvent::new(
            task.task_id.clone(),
            task.task_type.clone(),
            EventType::RecoveredFromDlq,
            HashMap::from([
                ("taskType".to_string(), json!(task.task_type)),
                ("previousRetryCount".to_string(), json!(previous_retry_count)),
            ]),
            Utc::now(),
        ))
        .await;

    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryDlqSink, InMemoryEventSink, InMemoryTaskStore};
    use serde_json::json;

    #[tokio::test]
    async fn process_persists_before_event_before_dlq_send() {
        let store = Arc::new(InMemoryTaskStore::new());
        let events = Arc::new(InMemoryEventSink::new());
        let dlq = Arc::new(InMemoryDlqSink::new());
        let processor = DeadLetterProcessor::new(store.clone(), events.clone(), dlq.clone(), "dlq".to_string());

        let mut task = Task::new("t1", "FAILING", json!({}));
        processor.process(&mut task, "boom").await;

        let stored = store.find_by_id("t1").await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::DeadLetter);

        let published = events.events();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type, EventType::MovedToDlq);

        assert_eq!(dlq.tasks().len(), 1);
    }

    #[tokio::test]
    async fn process_is_idempotent_for_already_dead_lettered_task() {
        let store = Arc::new(InMemoryTaskStore::new());
        let events = Arc::new(InMemoryEventSink::new());
        let dlq = Arc::new(InMemoryDlqSink::new());
        let processor = DeadLetterProcessor::new(store.clone(), events, dlq, "dlq".to_string());

        let mut task = Task::new("t1", "FAILING", json!({}));
        task.transition_to(TaskStatus::DeadLetter);
        store.save(&task).await.unwrap();

        processor.process(&mut task, "boom again").await;
        let stored = store.find_by_id("t1").await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::DeadLetter);
    }

    #[tokio::test]
    async fn recover_moves_dead_letter_task_back_to_pending() {
        let store = Arc::new(InMemoryTaskStore::new());
        let events_sink = Arc::new(InMemoryEventSink::new());
        let publisher = EventPublisher::new(events_sink.clone(), "events".to_string());

        let mut task = Task::new("t1", "FAILING", json!({}));
        task.retry_count = 2;
        task.transition_to(TaskStatus::DeadLetter);
        store.save(&task).await.unwrap();

        let recovered = recover_from_dead_letter(store.as_ref(), &publisher, "t1").await.unwrap();
        assert_eq!(recovered.status, TaskStatus::Pending);

        let published = events_sink.events();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type, EventType::RecoveredFromDlq);
    }

    #[tokio::test]
    async fn recover_rejects_non_dead_letter_task() {
        let store = Arc::new(InMemoryTaskStore::new());
        let events_sink = Arc::new(InMemoryEventSink::new());
        let publisher = EventPublisher::new(events_sink, "events".to_string());

        let task = Task::new("t1", "FAILING", json!({}));
        store.save(&task).await.unwrap();

        let err = recover_from_dead_letter(store.as_ref(), &publisher, "t1").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn recover_missing_task_is_not_found() {
        let store = Arc::new(InMemoryTaskStore::new());
        let events_sink = Arc::new(InMemoryEventSink::new());
        let publisher = EventPublisher::new(events_sink, "events".to_string());

        let err = recover_from_dead_letter(store.as_ref(), &publisher, "missing").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }
}
