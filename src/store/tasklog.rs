use crate::error::StoreError;
use chrono::Utc;
use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// Completed side-effect record (booked meeting, sent mail, generated file).
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: String,
}

pub trait TaskLog: Send + Sync {
    fn record<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
        title: &'a str,
        description: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TaskRecord, StoreError>> + Send + 'a>>;

    fn recent<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
        n: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TaskRecord>, StoreError>> + Send + 'a>>;
}

pub struct SqliteTaskLog {
    pool: SqlitePool,
}

impl SqliteTaskLog {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TaskLog for SqliteTaskLog {
    fn record<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
        title: &'a str,
        description: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<TaskRecord, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            let created_at = Utc::now().to_rfc3339();

            sqlx::query(
                "INSERT INTO task_log (id, user_id, persona, title, description, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&id)
            .bind(user)
            .bind(persona)
            .bind(title)
            .bind(description)
            .bind(&created_at)
            .execute(&self.pool)
            .await?;

            Ok(TaskRecord {
                id,
                title: title.to_string(),
                description: description.to_string(),
                created_at,
            })
        })
    }

    fn recent<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
        n: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TaskRecord>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            #[allow(clippy::cast_possible_wrap)]
            let limit = n as i64;

            let rows = sqlx::query(
                "SELECT id, title, description, created_at
                 FROM task_log
                 WHERE user_id = $1 AND persona = $2
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT $3",
            )
            .bind(user)
            .bind(persona)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

            rows.iter()
                .map(|row| {
                    Ok(TaskRecord {
                        id: row.try_get("id")?,
                        title: row.try_get("title")?,
                        description: row.try_get("description")?,
                        created_at: row.try_get("created_at")?,
                    })
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory_pool;

    #[tokio::test]
    async fn record_and_read_back() {
        let log = SqliteTaskLog::new(memory_pool().await);
        log.record("u1", "Dexter", "Booked \"Demo\"", "Calendar event created")
            .await
            .unwrap();
        log.record("u1", "Dexter", "Sent mail to a@b.se", "Subject: Hi")
            .await
            .unwrap();

        let recent = log.recent("u1", "Dexter", 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].title, "Sent mail to a@b.se");
    }

    #[tokio::test]
    async fn records_are_scoped_per_persona() {
        let log = SqliteTaskLog::new(memory_pool().await);
        log.record("u1", "Dexter", "a", "b").await.unwrap();
        let other = log.recent("u1", "Hunter", 10).await.unwrap();
        assert!(other.is_empty());
    }
}
