//! Durable audit trail for lifecycle events, populating `task_events` when a host opts in
//! via `StoreConfig::enable_audit_events`.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use task_engine_core::{EngineResult, EventSink, TaskEvent};

use crate::error::{from_diesel, from_pool};
use crate::models::TaskEventRecord;
use crate::postgres_store::PgPool;
use crate::schema::task_events;

/// `EventSink` that appends every event it sees to the `task_events` table. `topic`/`key`
/// are ignored; the row's own `task_id` is the only routing information this sink needs.
pub struct PostgresAuditEventSink {
    pool: Arc<PgPool>,
}

impl PostgresAuditEventSink {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventSink for PostgresAuditEventSink {
    async fn send(&self, _topic: &str, _key: &str, event: &TaskEvent) -> EngineResult<()> {
        let mut conn = self.pool.get().map_err(from_pool)?;
        let record = TaskEventRecord::from_domain(event);
        diesel::insert_into(task_events::table)
            .values(&record)
            .execute(&mut conn)
            .map_err(from_diesel)?;
        Ok(())
    }
}

/// Fans a single event out to every wrapped sink, so the bus transport and the audit trail
/// can be populated from the same publish call. All sinks are tried even if one fails; the
/// first failure is returned to the caller.
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn send(&self, topic: &str, key: &str, event: &TaskEvent) -> EngineResult<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(err) = sink.send(topic, key, event).await {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use task_engine_core::testing::InMemoryEventSink;
    use task_engine_core::EventType;

    fn event() -> TaskEvent {
        TaskEvent::new(
            "t1".to_string(),
            "SUCCESS".to_string(),
            EventType::TaskCompleted,
            HashMap::new(),
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn fans_out_to_every_sink() {
        let a = Arc::new(InMemoryEventSink::new());
        let b = Arc::new(InMemoryEventSink::new());
        let composite = CompositeEventSink::new(vec![a.clone(), b.clone()]);

        composite.send("events", "t1", &event()).await.unwrap();

        assert_eq!(a.events().len(), 1);
        assert_eq!(b.events().len(), 1);
    }

    #[tokio::test]
    async fn one_sink_failing_does_not_stop_the_others() {
        let failing = Arc::new(InMemoryEventSink::failing());
        let healthy = Arc::new(InMemoryEventSink::new());
        let composite = CompositeEventSink::new(vec![failing, healthy.clone()]);

        let result = composite.send("events", "t1", &event()).await;

        assert!(result.is_err());
        assert_eq!(healthy.events().len(), 1);
    }
}
