mod memory;
mod tasklog;
mod turns;

pub use memory::{SqliteTaskMemoryStore, TaskMemory, TaskMemoryPatch, TaskMemoryStore};
pub use tasklog::{SqliteTaskLog, TaskLog, TaskRecord};
pub use turns::{Sender, SqliteTurnStore, Turn, TurnStore};

use crate::error::StoreError;
use sqlx::sqlite::SqlitePool;

const SCHEMA_META_TABLE: &str = "
CREATE TABLE IF NOT EXISTS hive_schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
)";
const SCHEMA_VERSION_KEY: &str = "hive_schema_version";
const SCHEMA_VERSION: u32 = 1;

/// Create all tables and pin the schema version. Incompatible databases are
/// rejected rather than migrated.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(SCHEMA_META_TABLE).execute(pool).await?;

    let stored: Option<(String,)> =
        sqlx::query_as("SELECT value FROM hive_schema_meta WHERE key = $1")
            .bind(SCHEMA_VERSION_KEY)
            .fetch_optional(pool)
            .await?;

    if let Some((value,)) = stored {
        let parsed = value
            .parse::<u32>()
            .map_err(|_| StoreError::Migration(format!("invalid schema version value: {value}")))?;
        if parsed != SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "incompatible schema version: stored={parsed}, expected={SCHEMA_VERSION}. \
remove the database file and restart."
            )));
        }
    } else {
        sqlx::query("INSERT INTO hive_schema_meta (key, value) VALUES ($1, $2)")
            .bind(SCHEMA_VERSION_KEY)
            .bind(SCHEMA_VERSION.to_string())
            .execute(pool)
            .await?;
    }

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS turns (
             id TEXT PRIMARY KEY,
             user_id TEXT NOT NULL,
             persona TEXT NOT NULL,
             sender TEXT NOT NULL,
             content TEXT NOT NULL,
             created_at TEXT NOT NULL
         )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_turns_owner
             ON turns(user_id, persona, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS task_memory (
             user_id TEXT NOT NULL,
             persona TEXT NOT NULL,
             active_task TEXT,
             state TEXT NOT NULL,
             last_result_cache TEXT,
             last_result_at TEXT,
             updated_at TEXT NOT NULL,
             PRIMARY KEY (user_id, persona)
         )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS task_log (
             id TEXT PRIMARY KEY,
             user_id TEXT NOT NULL,
             persona TEXT NOT NULL,
             title TEXT NOT NULL,
             description TEXT NOT NULL,
             created_at TEXT NOT NULL
         )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    ensure_schema(&pool).await.unwrap();
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let pool = memory_pool().await;
        ensure_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn schema_version_mismatch_is_rejected() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(SCHEMA_META_TABLE).execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO hive_schema_meta (key, value) VALUES ($1, $2)")
            .bind(SCHEMA_VERSION_KEY)
            .bind("999")
            .execute(&pool)
            .await
            .unwrap();

        let err = ensure_schema(&pool).await.unwrap_err();
        assert!(err.to_string().contains("incompatible schema version"));
    }
}
