mod config;
mod handlers;
mod logging;

use std::env;
use std::sync::Arc;

use clap::Parser;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use dotenvy::dotenv;
use serde_json::json;
use task_engine_core::{
    DeadLetterProcessor, EngineConfig, EventPublisher, EventSink, ExecutionEngine,
    HandlerRegistry, Task,
};
use task_engine_store::{
    CompositeEventSink, PostgresAuditEventSink, PostgresTaskStore, RedisDlqSink, RedisEventSink,
};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::handlers::{AlwaysFailsHandler, AlwaysSucceedsHandler, FlakyThenSucceedsHandler};

/// Demo host process: wires the engine to concrete Postgres/Redis-backed ports and runs a
/// handful of tasks through it, exercising the full lifecycle end to end.
#[derive(Parser, Debug)]
#[command(name = "task-engine-app")]
struct Cli {
    /// Number of demo tasks of each kind to submit.
    #[arg(long, default_value_t = 1)]
    count: u32,
}

#[tokio::main]
async fn main() {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let app_config = AppConfig::from_env();

    if let Err(err) = run(app_config, cli).await {
        error!(error = %err, "task-engine-app exited with an error");
        std::process::exit(1);
    }
}

async fn run(app_config: AppConfig, cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    info!("starting task-engine-app demo");

    let manager = ConnectionManager::<PgConnection>::new(&app_config.store.database_url);
    let pg_pool: Pool<ConnectionManager<PgConnection>> = Pool::builder().build(manager)?;
    let pg_pool = Arc::new(pg_pool);

    if app_config.store.auto_initialize {
        task_engine_store::run_pending_migrations(&pg_pool)?;
    }

    let redis_client = redis::Client::open(app_config.store.redis_url.clone())?;
    let redis_events = redis_client.get_connection_manager().await?;
    let redis_dlq = redis_client.get_connection_manager().await?;

    let store = Arc::new(PostgresTaskStore::new(pg_pool.clone()));
    let redis_event_sink: Arc<dyn EventSink> = Arc::new(RedisEventSink::new(redis_events));
    let event_sink: Arc<dyn EventSink> = if app_config.store.enable_audit_events {
        let audit_sink = Arc::new(PostgresAuditEventSink::new(pg_pool.clone()));
        Arc::new(CompositeEventSink::new(vec![redis_event_sink, audit_sink]))
    } else {
        redis_event_sink
    };
    let dlq_sink = Arc::new(RedisDlqSink::new(redis_dlq));

    let registry = Arc::new(HandlerRegistry::new());
    registry.register(Arc::new(AlwaysSucceedsHandler)).await?;
    registry
        .register(Arc::new(FlakyThenSucceedsHandler::new()))
        .await?;
    registry.register(Arc::new(AlwaysFailsHandler)).await?;

    let event_publisher = EventPublisher::new(event_sink.clone(), app_config.store.events_topic.clone());
    let dlq_event_publisher_sink = event_sink.clone();
    let dead_letter = DeadLetterProcessor::new(
        store.clone(),
        dlq_event_publisher_sink,
        dlq_sink,
        app_config.store.dlq_topic.clone(),
    );
    let retry_config = app_config.engine.into();
    let engine = ExecutionEngine::new(store.clone(), event_publisher, dead_letter, retry_config);

    run_demo_scenarios(&engine, &registry, cli.count).await;

    run_sweeper(store, app_config.sweep_interval, app_config.stuck_threshold).await;

    Ok(())
}

async fn run_demo_scenarios(
    engine: &ExecutionEngine,
    registry: &HandlerRegistry,
    count: u32,
) {
    for i in 0..count {
        for task_type in ["SUCCESS", "FLAKY", "PERMANENT_FAILURE"] {
            let task = Task::new(
                format!("{task_type}-{i}"),
                task_type,
                json!({ "demo_iteration": i }),
            );
            let handler = match registry.lookup(task_type).await {
                Ok(Some(handler)) => handler,
                Ok(None) => {
                    error!(task_type, "no handler registered, skipping demo task");
                    continue;
                }
                Err(err) => {
                    error!(task_type, error = %err, "failed to look up handler");
                    continue;
                }
            };

            match engine.execute(task, handler).await {
                Ok(result) => info!(?result, task_type, "demo task settled"),
                Err(err) => error!(task_type, error = %err, "demo task failed to execute"),
            }
        }
    }
}

/// Minimal sweeper loop exercising `find_stuck` end to end, per the ambient-stack
/// "stuck-task recovery" surface. Not part of the engine crate's own public contract.
async fn run_sweeper(
    store: Arc<dyn task_engine_core::TaskStore>,
    interval: std::time::Duration,
    stuck_threshold: std::time::Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    // Run a single pass for the demo rather than looping forever, so the binary exits.
    ticker.tick().await;
    ticker.tick().await;

    let threshold = chrono::Utc::now()
        - chrono::Duration::from_std(stuck_threshold).unwrap_or_else(|_| chrono::Duration::zero());
    match store.find_stuck(threshold).await {
        Ok(stuck) if stuck.is_empty() => info!("sweeper found no stuck tasks"),
        Ok(stuck) => info!(count = stuck.len(), "sweeper found stuck tasks eligible for resubmission"),
        Err(err) => error!(error = %err, "sweeper failed to query stuck tasks"),
    }
}
