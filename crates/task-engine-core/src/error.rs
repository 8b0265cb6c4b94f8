//! Error taxonomy for the execution pipeline.
//!
//! A single [`EngineError`] covers every failure mode a caller of this crate can observe,
//! with `From` impls at the boundaries where a dependency's own error type crosses in.

use std::fmt;

use thiserror::Error;

/// Errors produced by the registry, retry strategy, execution engine, and dead-letter
/// processor.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no handler registered for task type '{0}'")]
    NotFound(String),

    #[error("transient store error: {0}")]
    TransientStoreError(String),

    #[error("task attempt exceeded its deadline")]
    Timeout,

    #[error("handler returned an error: {message}")]
    HandlerError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("event sink error: {0}")]
    SinkError(String),

    #[error("store error: {0}")]
    StoreError(String),
}

impl EngineError {
    pub fn handler(message: impl Into<String>) -> Self {
        EngineError::HandlerError {
            message: message.into(),
            source: None,
        }
    }

    pub fn handler_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        EngineError::HandlerError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Walks this error's cause chain (via [`std::error::Error::source`]) and classifies it
    /// as retryable or permanent.
    ///
    /// `Timeout` and `TransientStoreError` are retryable at any depth in the chain;
    /// everything else, including a bare `HandlerError` with no further information, is
    /// treated as permanent unless its caller explicitly set `retryable: true` on the
    /// originating [`crate::model::TaskResult::Failure`].
    pub fn is_retryable(&self) -> bool {
        fn walk(err: &(dyn std::error::Error + 'static)) -> bool {
            if let Some(engine_err) = err.downcast_ref::<EngineError>() {
                if matches!(
                    engine_err,
                    EngineError::Timeout | EngineError::TransientStoreError(_)
                ) {
                    return true;
                }
            }
            match err.source() {
                Some(source) => walk(source),
                None => false,
            }
        }

        match self {
            EngineError::Timeout | EngineError::TransientStoreError(_) => true,
            EngineError::HandlerError { source: Some(s), .. } => walk(s.as_ref()),
            _ => false,
        }
    }
}

/// Lightweight category used in log fields and event metadata; not exhaustive enough to
/// round-trip, only to group errors for operators at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Transient,
    Timeout,
    Handler,
    Sink,
    Store,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Transient => "transient",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Handler => "handler",
            ErrorCategory::Sink => "sink",
            ErrorCategory::Store => "store",
        };
        f.write_str(s)
    }
}

impl EngineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::InvalidArgument(_) => ErrorCategory::Validation,
            EngineError::NotFound(_) => ErrorCategory::NotFound,
            EngineError::TransientStoreError(_) => ErrorCategory::Transient,
            EngineError::Timeout => ErrorCategory::Timeout,
            EngineError::HandlerError { .. } => ErrorCategory::Handler,
            EngineError::SinkError(_) => ErrorCategory::Sink,
            EngineError::StoreError(_) => ErrorCategory::Store,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
