//! Fans lifecycle events out to the event sink with at-least-once, fire-and-forget
//! semantics from the engine's perspective.

use std::sync::Arc;

use tracing::{debug, error};

use crate::model::TaskEvent;
use crate::ports::EventSink;

/// Thin wrapper that turns an [`EventSink`] failure into a log line instead of a
/// propagated error. The pipeline's outcome must never depend on whether an event made it
/// to the bus.
pub struct EventPublisher {
    sink: Arc<dyn EventSink>,
    topic: String,
}

impl EventPublisher {
    pub fn new(sink: Arc<dyn EventSink>, topic: impl Into<String>) -> Self {
        Self {
            sink,
            topic: topic.into(),
        }
    }

    /// Publishes `event` keyed by its `task_id`. Never returns an error; failures are
    /// logged at `error` and otherwise swallowed.
    pub async fn publish(&self, event: &TaskEvent) {
        match self.sink.send(&self.topic, &event.task_id, event).await {
            Ok(()) => {
                debug!(
                    task_id = %event.task_id,
                    event_type = %event.event_type,
                    "published lifecycle event"
                );
            }
            Err(err) => {
                error!(
                    task_id = %event.task_id,
                    event_type = %event.event_type,
                    error = %err,
                    "failed to publish lifecycle event, dropping"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType;
    use crate::testing::InMemoryEventSink;
    use std::collections::HashMap;

    #[tokio::test]
    async fn publish_reaches_sink_on_success() {
        let sink = Arc::new(InMemoryEventSink::new());
        let publisher = EventPublisher::new(sink.clone(), "events");
        let event = TaskEvent::new("t1", "SUCCESS", EventType::TaskCompleted, HashMap::new(), chrono::Utc::now());
        publisher.publish(&event).await;
        assert_eq!(sink.events().len(), 1);
    }

    #[tokio::test]
    async fn publish_swallows_sink_failure() {
        let sink = Arc::new(InMemoryEventSink::failing());
        let publisher = EventPublisher::new(sink.clone(), "events");
        let event = TaskEvent::new("t1", "SUCCESS", EventType::TaskCompleted, HashMap::new(), chrono::Utc::now());
        // must not panic or propagate
        publisher.publish(&event).await;
        assert_eq!(sink.events().len(), 0);
    }
}
