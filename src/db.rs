//! PostgreSQL pool setup and schema migrations.

use std::time::Duration;

use sqlx::{Pool, Postgres, postgres::PgPoolOptions};

use crate::config::Config;

pub type DbPool = Pool<Postgres>;

/// How long a request waits for a free connection before failing.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connect eagerly so a bad `DATABASE_URL` fails at startup, not on the first request.
pub async fn create_pool(config: &Config) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(&config.database_url)
        .await
}

/// Apply pending migrations under `migrations/`, including the directory seed rows.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Round-trip a trivial query; used by the health endpoint.
pub async fn ping(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
