//! Example `TaskHandler` implementations used to exercise the pipeline end to end.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::json;
use task_engine_core::{EngineResult, Task, TaskHandler, TaskResult};

/// Always succeeds immediately. Exercises the success-on-first-try scenario.
pub struct AlwaysSucceedsHandler;

#[async_trait]
impl TaskHandler for AlwaysSucceedsHandler {
    fn task_type(&self) -> &str {
        "SUCCESS"
    }

    async fn execute(&self, task: &Task) -> EngineResult<TaskResult> {
        Ok(TaskResult::Success {
            task_id: task.task_id.clone(),
            result: HashMap::from([("ok".to_string(), json!(true))]),
        })
    }
}

/// Fails with a retryable error on its first two invocations, then succeeds. Exercises the
/// retry-then-succeed scenario.
pub struct FlakyThenSucceedsHandler {
    attempts: AtomicU32,
}

impl FlakyThenSucceedsHandler {
    pub fn new() -> Self {
        Self {
            attempts: AtomicU32::new(0),
        }
    }
}

impl Default for FlakyThenSucceedsHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskHandler for FlakyThenSucceedsHandler {
    fn task_type(&self) -> &str {
        "FLAKY"
    }

    async fn execute(&self, task: &Task) -> EngineResult<TaskResult> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= 2 {
            return Ok(TaskResult::Failure {
                task_id: task.task_id.clone(),
                error: format!("simulated transient failure on attempt {attempt}"),
                retryable: true,
            });
        }
        Ok(TaskResult::Success {
            task_id: task.task_id.clone(),
            result: HashMap::from([("attempts".to_string(), json!(attempt))]),
        })
    }
}

/// Always fails with a non-retryable error. Exercises the permanent-failure / dead-letter
/// scenario.
pub struct AlwaysFailsHandler;

#[async_trait]
impl TaskHandler for AlwaysFailsHandler {
    fn task_type(&self) -> &str {
        "PERMANENT_FAILURE"
    }

    async fn execute(&self, task: &Task) -> EngineResult<TaskResult> {
        Ok(TaskResult::Failure {
            task_id: task.task_id.clone(),
            error: "handler does not know how to process this payload".to_string(),
            retryable: false,
        })
    }
}
