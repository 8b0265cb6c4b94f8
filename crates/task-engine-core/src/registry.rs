//! Type-based handler dispatch.
//!
//! Lookups are lock-free reads of an `RwLock<HashMap>`; registration publishes the new
//! mapping atomically under the write lock. There is no lock held across `execute`: a
//! handler removed after `lookup` succeeded is still used for the already-in-flight
//! attempt, since the caller holds its own `Arc` clone.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::model::{Task, TaskResult};

/// Implemented by anything the registry can dispatch a [`Task`] to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// The task type this handler serves. Must be non-blank.
    fn task_type(&self) -> &str;

    async fn execute(&self, task: &Task) -> EngineResult<TaskResult>;
}

impl std::fmt::Debug for dyn TaskHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandler")
            .field("task_type", &self.task_type())
            .finish()
    }
}

/// Concurrent `type -> handler` map.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts or replaces the handler for its own `task_type()`. Overwrites are legal and
    /// logged at `warn`, not treated as an error.
    pub async fn register(&self, handler: Arc<dyn TaskHandler>) -> EngineResult<()> {
        let task_type = handler.task_type().trim();
        if task_type.is_empty() {
            return Err(EngineError::InvalidArgument(
                "handler task_type must not be blank".into(),
            ));
        }

        let mut handlers = self.handlers.write().await;
        if handlers.contains_key(task_type) {
            warn!(task_type, "overwriting existing handler registration");
        } else {
            debug!(task_type, "registering handler");
        }
        handlers.insert(task_type.to_string(), handler);
        Ok(())
    }

    pub async fn lookup(&self, task_type: &str) -> EngineResult<Option<Arc<dyn TaskHandler>>> {
        if task_type.trim().is_empty() {
            return Err(EngineError::InvalidArgument(
                "task_type must not be blank".into(),
            ));
        }
        let handlers = self.handlers.read().await;
        Ok(handlers.get(task_type).cloned())
    }

    pub async fn remove(&self, task_type: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.write().await.remove(task_type)
    }

    pub async fn has(&self, task_type: &str) -> bool {
        self.handlers.read().await.contains_key(task_type)
    }

    pub async fn count(&self) -> usize {
        self.handlers.read().await.len()
    }

    pub async fn clear(&self) {
        self.handlers.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysOk(&'static str);

    #[async_trait]
    impl TaskHandler for AlwaysOk {
        fn task_type(&self) -> &str {
            self.0
        }

        async fn execute(&self, task: &Task) -> EngineResult<TaskResult> {
            Ok(TaskResult::Success {
                task_id: task.task_id.clone(),
                result: Default::default(),
            })
        }
    }

    #[tokio::test]
    async fn register_then_lookup_roundtrips() {
        let registry = HandlerRegistry::new();
        registry.register(Arc::new(AlwaysOk("SUCCESS"))).await.unwrap();
        let found = registry.lookup("SUCCESS").await.unwrap();
        assert!(found.is_some());
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn lookup_missing_type_returns_none() {
        let registry = HandlerRegistry::new();
        let found = registry.lookup("MISSING").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn register_blank_type_is_invalid_argument() {
        let registry = HandlerRegistry::new();
        let err = registry.register(Arc::new(AlwaysOk("   "))).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn lookup_blank_type_is_invalid_argument() {
        let registry = HandlerRegistry::new();
        let err = registry.lookup("").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn overwrite_is_legal() {
        let registry = HandlerRegistry::new();
        registry.register(Arc::new(AlwaysOk("SUCCESS"))).await.unwrap();
        registry.register(Arc::new(AlwaysOk("SUCCESS"))).await.unwrap();
        assert_eq!(registry.count().await, 1);
    }

    #[tokio::test]
    async fn remove_and_has_and_clear() {
        let registry = HandlerRegistry::new();
        registry.register(Arc::new(AlwaysOk("SUCCESS"))).await.unwrap();
        assert!(registry.has("SUCCESS").await);
        registry.remove("SUCCESS").await;
        assert!(!registry.has("SUCCESS").await);

        registry.register(Arc::new(AlwaysOk("A"))).await.unwrap();
        registry.register(Arc::new(AlwaysOk("B"))).await.unwrap();
        registry.clear().await;
        assert_eq!(registry.count().await, 0);
    }
}
