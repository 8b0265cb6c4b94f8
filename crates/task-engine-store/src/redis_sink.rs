//! Redis-stream-backed `EventSink`/`DlqSink`.
//!
//! Each call is `XADD <topic> * key <task_id> value <json>`; the wire format is JSON
//! regardless of transport, matching the persistence contract exactly.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::json;
use task_engine_core::{DlqSink, EngineResult, EventSink, Task, TaskEvent};
use tokio::sync::RwLock;

use crate::error::{from_json, from_redis};

async fn xadd_json(
    connection: &RwLock<ConnectionManager>,
    topic: &str,
    key: &str,
    value: &str,
) -> EngineResult<()> {
    let mut conn = connection.write().await;
    conn.xadd::<_, _, _, _, ()>(topic, "*", &[("key", key), ("value", value)])
        .await
        .map_err(from_redis)
}

/// `EventSink` writing lifecycle events to a Redis stream.
pub struct RedisEventSink {
    connection: RwLock<ConnectionManager>,
}

impl RedisEventSink {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection: RwLock::new(connection),
        }
    }
}

#[async_trait]
impl EventSink for RedisEventSink {
    async fn send(&self, topic: &str, key: &str, event: &TaskEvent) -> EngineResult<()> {
        let payload = json!({
            "taskId": event.task_id,
            "taskType": event.task_type,
            "eventType": event.event_type.to_string(),
            "metadata": event.metadata,
            "timestamp": event.timestamp,
        });
        let value = serde_json::to_string(&payload).map_err(from_json)?;
        xadd_json(&self.connection, topic, key, &value).await
    }
}

/// `DlqSink` writing dead-lettered task payloads to a separate Redis stream.
pub struct RedisDlqSink {
    connection: RwLock<ConnectionManager>,
}

impl RedisDlqSink {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection: RwLock::new(connection),
        }
    }
}

#[async_trait]
impl DlqSink for RedisDlqSink {
    async fn send(&self, topic: &str, key: &str, task: &Task) -> EngineResult<()> {
        let value = serde_json::to_string(task).map_err(from_json)?;
        xadd_json(&self.connection, topic, key, &value).await
    }
}
