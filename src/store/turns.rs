use crate::error::StoreError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Agent,
    System,
}

/// One conversation turn, append-only, owned by (user, persona).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub created_at: String,
}

/// Append/read contract for the conversation log.
pub trait TurnStore: Send + Sync {
    fn append_turn<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
        sender: Sender,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Turn, StoreError>> + Send + 'a>>;

    /// Most recent `n` turns, descending by time.
    fn read_recent<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
        n: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Turn>, StoreError>> + Send + 'a>>;
}

fn sender_to_str(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "user",
        Sender::Agent => "agent",
        Sender::System => "system",
    }
}

fn str_to_sender(value: &str) -> Result<Sender, StoreError> {
    match value {
        "user" => Ok(Sender::User),
        "agent" => Ok(Sender::Agent),
        "system" => Ok(Sender::System),
        other => Err(StoreError::Query(format!("unknown sender: {other}"))),
    }
}

fn map_turn_row(row: &SqliteRow) -> Result<Turn, StoreError> {
    let sender_raw: String = row.try_get("sender")?;
    Ok(Turn {
        id: row.try_get("id")?,
        sender: str_to_sender(&sender_raw)?,
        text: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

/// SQLite-backed turn store using an sqlx async pool.
pub struct SqliteTurnStore {
    pool: SqlitePool,
}

impl SqliteTurnStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TurnStore for SqliteTurnStore {
    fn append_turn<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
        sender: Sender,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Turn, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let id = Uuid::new_v4().to_string();
            let created_at = Utc::now().to_rfc3339();

            sqlx::query(
                "INSERT INTO turns (id, user_id, persona, sender, content, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&id)
            .bind(user)
            .bind(persona)
            .bind(sender_to_str(sender))
            .bind(text)
            .bind(&created_at)
            .execute(&self.pool)
            .await?;

            Ok(Turn {
                id,
                sender,
                text: text.to_string(),
                created_at,
            })
        })
    }

    fn read_recent<'a>(
        &'a self,
        user: &'a str,
        persona: &'a str,
        n: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Turn>, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            #[allow(clippy::cast_possible_wrap)]
            let limit = n as i64;

            // rowid breaks ties for turns created within the same
            // millisecond.
            let rows = sqlx::query(
                "SELECT id, sender, content, created_at
                 FROM turns
                 WHERE user_id = $1 AND persona = $2
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT $3",
            )
            .bind(user)
            .bind(persona)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(map_turn_row).collect()
        })
    }
}
