//! Schema bootstrap: runs pending migrations when `StoreConfig::auto_initialize` is set.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use task_engine_core::{EngineError, EngineResult};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Runs any pending migrations against the pool's database. Intended for demo/bootstrap
/// use; production deployments typically run migrations out-of-band instead.
pub fn run_pending_migrations(pool: &Pool<ConnectionManager<PgConnection>>) -> EngineResult<()> {
    let mut conn = pool
        .get()
        .map_err(|err| EngineError::TransientStoreError(format!("connection pool exhausted: {err}")))?;

    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| EngineError::StoreError(format!("migration failed: {err}")))?;

    Ok(())
}
