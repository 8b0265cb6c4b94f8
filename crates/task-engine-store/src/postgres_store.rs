//! Diesel/PostgreSQL-backed `TaskStore`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;
use task_engine_core::{EngineResult, Page, Task, TaskStatus, TaskStore};

use crate::error::{from_diesel, from_pool};
use crate::models::TaskRecord;
use crate::schema::tasks;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// `TaskStore` backed by a pooled Diesel/PostgreSQL connection, matching the relational
/// schema created by this crate's migrations.
pub struct PostgresTaskStore {
    pool: Arc<PgPool>,
}

impl PostgresTaskStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> EngineResult<PooledConnection<ConnectionManager<PgConnection>>> {
        self.pool.get().map_err(from_pool)
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn save(&self, task: &Task) -> EngineResult<()> {
        let mut conn = self.get_connection()?;
        let record = TaskRecord::from(task);

        diesel::insert_into(tasks::table)
            .values(&record)
            .on_conflict(tasks::task_id)
            .do_update()
            .set(&record)
            .execute(&mut conn)
            .map_err(from_diesel)?;

        Ok(())
    }

    async fn find_by_id(&self, task_id: &str) -> EngineResult<Option<Task>> {
        let mut conn = self.get_connection()?;
        let record: Option<TaskRecord> = tasks::table
            .filter(tasks::task_id.eq(task_id))
            .first(&mut conn)
            .optional()
            .map_err(from_diesel)?;
        Ok(record.map(Task::from))
    }

    async fn find_by_status(&self, status: TaskStatus, page: Page) -> EngineResult<Vec<Task>> {
        let mut conn = self.get_connection()?;
        let mut query = tasks::table
            .filter(tasks::status.eq(status.to_string()))
            .order(tasks::created_at.asc())
            .offset(page.offset as i64)
            .into_boxed();
        if page.limit > 0 {
            query = query.limit(page.limit as i64);
        }
        let records: Vec<TaskRecord> = query.load(&mut conn).map_err(from_diesel)?;
        Ok(records.into_iter().map(Task::from).collect())
    }

    async fn find_by_type(&self, task_type: &str, page: Page) -> EngineResult<Vec<Task>> {
        let mut conn = self.get_connection()?;
        let mut query = tasks::table
            .filter(tasks::task_type.eq(task_type))
            .order(tasks::created_at.asc())
            .offset(page.offset as i64)
            .into_boxed();
        if page.limit > 0 {
            query = query.limit(page.limit as i64);
        }
        let records: Vec<TaskRecord> = query.load(&mut conn).map_err(from_diesel)?;
        Ok(records.into_iter().map(Task::from).collect())
    }

    async fn find_by_type_and_status(
        &self,
        task_type: &str,
        status: TaskStatus,
        page: Page,
    ) -> EngineResult<Vec<Task>> {
        let mut conn = self.get_connection()?;
        let mut query = tasks::table
            .filter(tasks::task_type.eq(task_type))
            .filter(tasks::status.eq(status.to_string()))
            .order(tasks::created_at.asc())
            .offset(page.offset as i64)
            .into_boxed();
        if page.limit > 0 {
            query = query.limit(page.limit as i64);
        }
        let records: Vec<TaskRecord> = query.load(&mut conn).map_err(from_diesel)?;
        Ok(records.into_iter().map(Task::from).collect())
    }

    async fn find_failed_for_retry(&self, max_retries: u32) -> EngineResult<Vec<Task>> {
        let mut conn = self.get_connection()?;
        let records: Vec<TaskRecord> = tasks::table
            .filter(tasks::status.eq(TaskStatus::Failed.to_string()))
            .filter(tasks::retry_count.le(max_retries as i32))
            .order(tasks::updated_at.asc())
            .load(&mut conn)
            .map_err(from_diesel)?;
        Ok(records.into_iter().map(Task::from).collect())
    }

    async fn find_stuck(&self, threshold: DateTime<Utc>) -> EngineResult<Vec<Task>> {
        let mut conn = self.get_connection()?;
        let records: Vec<TaskRecord> = tasks::table
            .filter(tasks::status.eq(TaskStatus::InProgress.to_string()))
            .filter(tasks::updated_at.lt(threshold))
            .order(tasks::updated_at.asc())
            .load(&mut conn)
            .map_err(from_diesel)?;
        Ok(records.into_iter().map(Task::from).collect())
    }

    async fn update_status(&self, task_id: &str, status: TaskStatus) -> EngineResult<()> {
        let mut conn = self.get_connection()?;
        diesel::update(tasks::table)
            .filter(tasks::task_id.eq(task_id))
            .set((tasks::status.eq(status.to_string()), tasks::updated_at.eq(Utc::now())))
            .execute(&mut conn)
            .map_err(from_diesel)?;
        Ok(())
    }

    async fn increment_retry(&self, task_id: &str) -> EngineResult<()> {
        let mut conn = self.get_connection()?;
        diesel::update(tasks::table)
            .filter(tasks::task_id.eq(task_id))
            .set((
                tasks::retry_count.eq(tasks::retry_count + 1),
                tasks::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .map_err(from_diesel)?;
        Ok(())
    }

    async fn delete_completed_older_than(&self, threshold: DateTime<Utc>) -> EngineResult<u64> {
        let mut conn = self.get_connection()?;
        let deleted = diesel::delete(
            tasks::table
                .filter(tasks::status.eq(TaskStatus::Completed.to_string()))
                .filter(tasks::updated_at.lt(threshold)),
        )
        .execute(&mut conn)
        .map_err(from_diesel)?;
        Ok(deleted as u64)
    }
}
