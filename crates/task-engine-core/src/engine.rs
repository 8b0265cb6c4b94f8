//! The lifecycle coordinator: mark-started, attempt loop, settle, persist, emit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{error, info};

use crate::dead_letter::DeadLetterProcessor;
use crate::error::{EngineError, EngineResult};
use crate::events::EventPublisher;
use crate::model::{EventType, Task, TaskEvent, TaskResult, TaskStatus};
use crate::ports::TaskStore;
use crate::registry::TaskHandler;
use crate::retry::{self, RetryConfig};

/// One entry point: [`ExecutionEngine::execute`]. Owns the task for the duration of the
/// call; ownership returns to the store once it settles.
pub struct ExecutionEngine {
    store: Arc<dyn TaskStore>,
    events: EventPublisher,
    dead_letter: DeadLetterProcessor,
    retry_config: RetryConfig,
}

impl ExecutionEngine {
    pub fn new(
        store: Arc<dyn TaskStore>,
        events: EventPublisher,
        dead_letter: DeadLetterProcessor,
        retry_config: RetryConfig,
    ) -> Self {
        Self {
            store,
            events,
            dead_letter,
            retry_config,
        }
    }

    pub async fn execute(
        &self,
        mut task: Task,
        handler: Arc<dyn TaskHandler>,
    ) -> EngineResult<TaskResult> {
        if task.task_id.trim().is_empty() {
            return Err(EngineError::InvalidArgument("task_id must not be blank".into()));
        }
        if task.task_type.trim().is_empty() {
            return Err(EngineError::InvalidArgument("type must not be blank".into()));
        }

        // 1. Mark started. Store failure here aborts with no event emitted.
        task.transition_to(TaskStatus::InProgress);
        self.store.save(&task).await.map_err(|err| {
            error!(task_id = %task.task_id, error = %err, "failed to persist mark-started, aborting");
            err
        })?;
        self.events
            .publish(&TaskEvent::new(
                task.task_id.clone(),
                task.task_type.clone(),
                EventType::TaskStarted,
                HashMap::new(),
                Utc::now(),
            ))
            .await;

        // 2. Attempt loop, enforcing attempt_timeout per attempt; elapsed timeout counts as
        // retryable.
        let attempt_timeout = self.retry_config.attempt_timeout;
        let task_for_attempts = task.clone();
        let outcome = retry::run(&self.retry_config, &task.task_id, |attempt_no| {
            let handler = handler.clone();
            let task = task_for_attempts.clone();
            async move {
                match tokio::time::timeout(attempt_timeout, handler.execute(&task)).await {
                    Ok(Ok(result)) => match &result {
                        TaskResult::Success { .. } => Ok(result),
                        TaskResult::Failure { error, retryable, .. } => {
                            if *retryable {
                                Err(EngineError::TransientStoreError(error.clone()))
                            } else {
                                Err(EngineError::handler(error.clone()))
                            }
                        }
                    },
                    Ok(Err(err)) => Err(err),
                    Err(_elapsed) => {
                        info!(task_id = %task.task_id, attempt = attempt_no, "attempt timed out");
                        Err(EngineError::Timeout)
                    }
                }
            }
        })
        .await;

        // 3. Settle.
        task.retry_count = outcome.attempts.saturating_sub(1);
        let result = outcome.result;
        match &result {
            TaskResult::Success { result: payload, .. } => {
                task.transition_to(TaskStatus::Completed);
                self.persist_at_settle(&task).await;
                self.events
                    .publish(&TaskEvent::new(
                        task.task_id.clone(),
                        task.task_type.clone(),
                        EventType::TaskCompleted,
                        HashMap::from([
                            ("taskType".to_string(), json!(task.task_type)),
                            ("retryCount".to_string(), json!(task.retry_count)),
                            ("result".to_string(), json!(payload)),
                        ]),
                        Utc::now(),
                    ))
                    .await;
            }
            TaskResult::Failure { error, retryable: true, .. } => {
                task.transition_to(TaskStatus::Failed);
                self.persist_at_settle(&task).await;
                self.events
                    .publish(&TaskEvent::new(
                        task.task_id.clone(),
                        task.task_type.clone(),
                        EventType::TaskFailed,
                        HashMap::from([
                            ("taskType".to_string(), json!(task.task_type)),
                            ("retryCount".to_string(), json!(task.retry_count)),
                            ("error".to_string(), json!(error)),
                            ("retryable".to_string(), json!(true)),
                        ]),
                        Utc::now(),
                    ))
                    .await;
            }
            TaskResult::Failure { error, retryable: false, .. } => {
                self.dead_letter.process(&mut task, error).await;
            }
        }

        Ok(result)
    }

    /// Store save failure at settle is logged, not surfaced. The caller still gets the
    /// settled `Result` they are entitled to.
    async fn persist_at_settle(&self, task: &Task) {
        if let Err(err) = self.store.save(task).await {
            error!(task_id = %task.task_id, error = %err, "failed to persist final status, outcome unaffected");
        }
    }
}
