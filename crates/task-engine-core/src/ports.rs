//! External contracts the engine depends on but does not implement.
//!
//! Concrete, swappable implementations of these traits live in `task-engine-store`
//! (Diesel/PostgreSQL, Redis streams); in-memory fakes for tests live in
//! [`crate::testing`] behind the `testing` feature. The engine itself only ever sees the
//! trait objects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::EngineResult;
use crate::model::{Task, TaskEvent, TaskStatus};

/// A page of results from a listing query. Store implementations decide page size; the
/// engine never paginates on the caller's behalf.
#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

/// Persistence of [`Task`] rows.
///
/// Implementations are expected to be backed by a relational store with a JSON column for
/// `data`, but the trait itself makes no assumption beyond "durable key-value by
/// `task_id`".
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn save(&self, task: &Task) -> EngineResult<()>;

    async fn find_by_id(&self, task_id: &str) -> EngineResult<Option<Task>>;

    async fn find_by_status(&self, status: TaskStatus, page: Page) -> EngineResult<Vec<Task>>;

    async fn find_by_type(&self, task_type: &str, page: Page) -> EngineResult<Vec<Task>>;

    async fn find_by_type_and_status(
        &self,
        task_type: &str,
        status: TaskStatus,
        page: Page,
    ) -> EngineResult<Vec<Task>>;

    async fn find_failed_for_retry(&self, max_retries: u32) -> EngineResult<Vec<Task>>;

    /// Tasks that have sat in `IN_PROGRESS` since before `threshold`, candidates for the
    /// stuck-task sweeper.
    async fn find_stuck(&self, threshold: DateTime<Utc>) -> EngineResult<Vec<Task>>;

    async fn update_status(&self, task_id: &str, status: TaskStatus) -> EngineResult<()>;

    async fn increment_retry(&self, task_id: &str) -> EngineResult<()>;

    async fn delete_completed_older_than(&self, threshold: DateTime<Utc>) -> EngineResult<u64>;
}

/// Publishes lifecycle events, keyed by `task_id` so a single consumer sees per-task order.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, topic: &str, key: &str, event: &TaskEvent) -> EngineResult<()>;
}

/// Accepts tasks the pipeline has given up on. Shares the same shape as [`EventSink`] but
/// is kept as a distinct trait so a host can route it to a different topic or transport
/// without the two concerns leaking into each other.
#[async_trait]
pub trait DlqSink: Send + Sync {
    async fn send(&self, topic: &str, key: &str, task: &Task) -> EngineResult<()>;
}

/// Pluggable source of `now()`, so retry-timing tests don't depend on wall-clock sleeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The [`Clock`] every non-test caller should use.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
