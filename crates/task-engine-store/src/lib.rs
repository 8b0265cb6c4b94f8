//! Concrete, swappable implementations of `task-engine-core`'s ports: a Diesel/PostgreSQL
//! `TaskStore`, and Redis-stream-backed `EventSink`/`DlqSink`.

pub mod audit;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod models;
pub mod postgres_store;
pub mod redis_sink;
pub mod schema;

pub use audit::{CompositeEventSink, PostgresAuditEventSink};
pub use bootstrap::run_pending_migrations;
pub use config::StoreConfig;
pub use postgres_store::{PgPool, PostgresTaskStore};
pub use redis_sink::{RedisDlqSink, RedisEventSink};

#[cfg(test)]
mod tests {
    use super::*;
    use task_engine_core::{Task, TaskStatus};

    #[test]
    fn task_record_round_trips_through_domain_task() {
        let task = Task::new("t1", "SUCCESS", serde_json::json!({"a": 1}));
        let record = models::TaskRecord::from(&task);
        let back: Task = record.into();
        assert_eq!(back.task_id, task.task_id);
        assert_eq!(back.task_type, task.task_type);
        assert_eq!(back.status, TaskStatus::Pending);
    }

    #[test]
    fn store_config_defaults_match_documented_topics() {
        let config = StoreConfig::default();
        assert_eq!(config.events_topic, "task-events");
        assert_eq!(config.dlq_topic, "task-dlq");
    }
}
