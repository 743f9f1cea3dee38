//! SQLite-backed run history.
//!
//! Opened by the sink once per run. All queries go through the
//! repositories in [`repositories`]; the schema lives in `migrations/` and
//! is embedded at compile time.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub mod models;
pub mod repositories;

pub type DbPool = sqlx::SqlitePool;

/// Row identifier type.
pub type DbId = i64;

/// Timestamp type stored in every table.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Open (creating if needed) the history database at `path`.
///
/// A single connection is enough: the orchestrator is the only writer.
pub async fn open(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

/// Open a private in-memory database. The single connection is pinned so
/// the data lives as long as the pool.
pub async fn open_in_memory() -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Apply embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    tracing::debug!("History database health check passed");
    Ok(())
}
