//! Core execution pipeline for the task engine.
//!
//! Owns the lifecycle state machine (`PENDING -> IN_PROGRESS -> {COMPLETED, FAILED,
//! DEAD_LETTER}`), the handler registry, the retry strategy, the dead-letter processor, and
//! the event publisher. Persistence, event bus, and DLQ bus are external ports
//! ([`ports::TaskStore`], [`ports::EventSink`], [`ports::DlqSink`]) implemented by
//! `task-engine-store`; in-memory fakes for tests live in [`testing`] behind the `testing`
//! feature.

pub mod config;
pub mod dead_letter;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod ports;
pub mod registry;
pub mod retry;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::EngineConfig;
pub use dead_letter::{recover_from_dead_letter, DeadLetterProcessor};
pub use engine::ExecutionEngine;
pub use error::{EngineError, EngineResult};
pub use events::EventPublisher;
pub use model::{EventType, Task, TaskEvent, TaskResult, TaskStatus};
pub use ports::{Clock, DlqSink, EventSink, Page, SystemClock, TaskStore};
pub use registry::{HandlerRegistry, TaskHandler};
pub use retry::{RetryConfig, RetryOutcome};
