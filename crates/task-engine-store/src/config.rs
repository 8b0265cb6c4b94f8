//! Schema shaping and sink-topic configuration. The part of the persistence contract
//! only a concrete store/sink implementation cares about.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_url: String,
    pub schema_name: String,
    pub table_prefix: String,
    pub tasks_table_name: String,
    pub auto_initialize: bool,
    pub enable_audit_events: bool,
    pub redis_url: String,
    pub events_topic: String,
    pub dlq_topic: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/task_engine".to_string(),
            schema_name: "public".to_string(),
            table_prefix: String::new(),
            tasks_table_name: "tasks".to_string(),
            auto_initialize: false,
            enable_audit_events: true,
            redis_url: "redis://localhost:6379".to_string(),
            events_topic: "task-events".to_string(),
            dlq_topic: "task-dlq".to_string(),
        }
    }
}

impl StoreConfig {
    /// Fully-qualified table name honoring `schema_name`/`table_prefix`.
    pub fn qualified_table(&self, name: &str) -> String {
        format!("{}.{}{}", self.schema_name, self.table_prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_table_honors_prefix_and_schema() {
        let config = StoreConfig {
            schema_name: "engine".to_string(),
            table_prefix: "te_".to_string(),
            ..StoreConfig::default()
        };
        assert_eq!(config.qualified_table("tasks"), "engine.te_tasks");
    }
}
