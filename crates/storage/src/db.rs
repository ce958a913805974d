use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{self, SqliteConnectOptions, SqlitePool};
use tracing::info;

use crate::error::StoreError;

/// Opens (and creates if missing) the trade-order store. WAL plus a busy
/// timeout lets dashboards and audit tools read while the single pipeline
/// writer commits.
pub async fn connect(db_path: &str) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))?
        .create_if_missing(true)
        .journal_mode(sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlite::SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .statement_cache_capacity(100);

    let pool = SqlitePool::connect_with(options).await?;

    let schema = include_str!("../../../sql/schema.sql");
    sqlx::raw_sql(schema).execute(&pool).await?;

    info!("store ready at {}", db_path);
    Ok(pool)
}
