//! Environment-based configuration composing `EngineConfig` and `StoreConfig`.
//!
//! Not a generic config-loading framework: the engine itself takes configuration as plain
//! struct fields, and this module is only the demo binary's own bootstrap surface.

use std::env;
use std::time::Duration;

use task_engine_core::EngineConfig;
use task_engine_store::StoreConfig;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub store: StoreConfig,
    pub sweep_interval: Duration,
    pub stuck_threshold: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let engine = EngineConfig {
            max_retries: env_parse("TASK_ENGINE_MAX_RETRIES", 3),
            initial_delay: Duration::from_millis(env_parse("TASK_ENGINE_INITIAL_DELAY_MS", 1_000)),
            max_delay: Duration::from_millis(env_parse("TASK_ENGINE_MAX_DELAY_MS", 60_000)),
            attempt_timeout: Duration::from_millis(env_parse("TASK_ENGINE_ATTEMPT_TIMEOUT_MS", 5_000)),
        };

        let store = StoreConfig {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/task_engine".to_string()),
            schema_name: env::var("TASK_ENGINE_SCHEMA").unwrap_or_else(|_| "public".to_string()),
            table_prefix: env::var("TASK_ENGINE_TABLE_PREFIX").unwrap_or_default(),
            tasks_table_name: env::var("TASK_ENGINE_TASKS_TABLE").unwrap_or_else(|_| "tasks".to_string()),
            auto_initialize: env_parse("TASK_ENGINE_AUTO_INITIALIZE", false),
            enable_audit_events: env_parse("TASK_ENGINE_ENABLE_AUDIT_EVENTS", true),
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            events_topic: env::var("TASK_ENGINE_EVENTS_TOPIC").unwrap_or_else(|_| "task-events".to_string()),
            dlq_topic: env::var("TASK_ENGINE_DLQ_TOPIC").unwrap_or_else(|_| "task-dlq".to_string()),
        };

        Self {
            engine,
            store,
            sweep_interval: Duration::from_secs(env_parse("TASK_ENGINE_SWEEP_INTERVAL_SECS", 30)),
            stuck_threshold: Duration::from_secs(env_parse("TASK_ENGINE_STUCK_THRESHOLD_SECS", 300)),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!(key, value = %value, "invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}
