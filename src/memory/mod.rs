//! Short-term conversation memory.
//!
//! SQLite-backed log of user/assistant turns. The chat service reads the
//! most recent N messages to build the prompt transcript; memory failures
//! never fail a chat turn.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryMessage {
    pub id: i64,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct MemoryStore {
    pool: SqlitePool,
}

impl MemoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS memories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn append(&self, role: &str, content: &str) -> Result<i64, ApiError> {
        let result = sqlx::query("INSERT INTO memories (role, content) VALUES (?1, ?2)")
            .bind(role)
            .bind(content)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(result.last_insert_rowid())
    }

    /// The most recent `limit` messages, oldest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<MemoryMessage>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, role, content, created_at
             FROM memories
             ORDER BY id DESC
             LIMIT ?1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut messages: Vec<MemoryMessage> = rows
            .iter()
            .map(|row| MemoryMessage {
                id: row.get("id"),
                role: row.get("role"),
                content: row.get("content"),
                created_at: row.get("created_at"),
            })
            .collect();

        messages.reverse();
        Ok(messages)
    }

    pub async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM memories")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> MemoryStore {
        let tmp = std::env::temp_dir().join(format!("copilot-memory-test-{}.db", uuid::Uuid::new_v4()));
        MemoryStore::new(tmp).await.unwrap()
    }

    #[tokio::test]
    async fn append_and_count() {
        let store = test_store().await;

        store.append("user", "hello").await.unwrap();
        store.append("assistant", "hi there").await.unwrap();

        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn recent_returns_chronological_order_capped_at_limit() {
        let store = test_store().await;

        for i in 0..5 {
            store.append("user", &format!("message {}", i)).await.unwrap();
        }

        let recent = store.recent(3).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();

        assert_eq!(contents, vec!["message 2", "message 3", "message 4"]);
    }

    #[tokio::test]
    async fn recent_with_zero_limit_is_empty() {
        let store = test_store().await;
        store.append("user", "hello").await.unwrap();

        assert!(store.recent(0).await.unwrap().is_empty());
    }
}
