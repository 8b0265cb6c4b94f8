//! Conversion from this crate's dependency errors into `task_engine_core::EngineError`.

use task_engine_core::EngineError;

pub fn from_diesel(err: diesel::result::Error) -> EngineError {
    EngineError::StoreError(format!("diesel error: {err}"))
}

pub fn from_pool(err: diesel::r2d2::PoolError) -> EngineError {
    EngineError::TransientStoreError(format!("connection pool exhausted: {err}"))
}

pub fn from_redis(err: redis::RedisError) -> EngineError {
    if err.is_timeout() || err.is_connection_dropped() || err.is_connection_refusal() {
        EngineError::TransientStoreError(format!("redis transient error: {err}"))
    } else {
        EngineError::SinkError(format!("redis error: {err}"))
    }
}

pub fn from_json(err: serde_json::Error) -> EngineError {
    EngineError::SinkError(format!("failed to encode event payload: {err}"))
}
