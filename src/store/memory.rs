use crate::error::StoreError;
use crate::state::ConversationState;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

/// Per-(user, persona) task record. Merge-written, last write wins — no
/// cross-turn locking (single-active-chat-window assumption).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMemory {
    pub active_task: Option<String>,
    pub state: ConversationState,
    pub last_result_cache: Option<String>,
    pub last_result_at: Option<String>,
}

/// Partial update. `None` fields preserve the stored value, making repeated
/// merges of the same patch idempotent.
#[derive(Debug, Clone, Default)]
pub struct TaskMemoryPatch {
    pub state: Option<ConversationState>,
    /// Outer `None` preserves; `Some(None)` clears the active task.
    pub active_task: Option<Option<String>>,
    pub last_result_cache: Option<String>,
}

impl TaskMemoryPatch {
    #[must_use]
    pub fn apply_to(&self, mut memory: TaskMemory) -> TaskMemory {
        if let Some(state) = self.state {
            memory.state = state;
        }
        if let Some(task) = &self.active_task {
            memory.active_task = task.clone();
        }
        if let Some(cache) = &self.last_result_cache {
            memory.last_result_cache = Some(cache.clone());
            memory.last_result_at = Some(Utc::now().to_rfc3339());
        }
        memory
    }
}

pub trait TaskMemoryStore: Send + Sync {
    fn read<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<TaskMemory>, StoreError>> + Send + 'a>>;

    fn merge_write<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
        patch: TaskMemoryPatch,
    ) -> Pin<Box<dyn Future<Output = Result<TaskMemory, StoreError>> + Send + 'a>>;
}

/// SQLite-backed task memory. Merge is read-modify-write in process: the
/// stored row is loaded (or defaulted), patched, and written back whole.
pub struct SqliteTaskMemoryStore {
    pool: SqlitePool,
}

impl SqliteTaskMemoryStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load(&self, user: &str, persona: &str) -> Result<Option<TaskMemory>, StoreError> {
        let row = sqlx::query(
            "SELECT active_task, state, last_result_cache, last_result_at
             FROM task_memory
             WHERE user_id = $1 AND persona = $2",
        )
        .bind(user)
        .bind(persona)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let state_raw: String = row.try_get("state")?;
        let state = ConversationState::from_str(&state_raw)
            .map_err(|_| StoreError::Query(format!("unknown conversation state: {state_raw}")))?;

        Ok(Some(TaskMemory {
            active_task: row.try_get("active_task")?,
            state,
            last_result_cache: row.try_get("last_result_cache")?,
            last_result_at: row.try_get("last_result_at")?,
        }))
    }
}

impl TaskMemoryStore for SqliteTaskMemoryStore {
    fn read<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<TaskMemory>, StoreError>> + Send + 'a>> {
        Box::pin(async move { self.load(user, persona).await })
    }

    fn merge_write<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
        patch: TaskMemoryPatch,
    ) -> Pin<Box<dyn Future<Output = Result<TaskMemory, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let current = self.load(user, persona).await?.unwrap_or_default();
            let merged = patch.apply_to(current);
            let updated_at = Utc::now().to_rfc3339();

            sqlx::query(
                "INSERT INTO task_memory
                     (user_id, persona, active_task, state, last_result_cache, last_result_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT(user_id, persona) DO UPDATE SET
                     active_task = excluded.active_task,
                     state = excluded.state,
                     last_result_cache = excluded.last_result_cache,
                     last_result_at = excluded.last_result_at,
                     updated_at = excluded.updated_at",
            )
            .bind(user)
            .bind(persona)
            .bind(&merged.active_task)
            .bind(merged.state.to_string())
            .bind(&merged.last_result_cache)
            .bind(&merged.last_result_at)
            .bind(&updated_at)
            .execute(&self.pool)
            .await?;

            Ok(merged)
        })
    }
}
