//! SQLite-backed vector store implementation.
//!
//! Chunk embeddings are stored as little-endian f32 blobs; similarity
//! search is brute-force cosine over the stored vectors, filtered by the
//! caller's threshold.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{RetrievalMatch, StoredChunk, Upload, UploadStatus, VectorStore};
use crate::core::config::AppPaths;
use crate::core::errors::IngestError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
}

impl SqliteVectorStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, IngestError> {
        let db_path = paths.user_data_dir.join("rag.db");
        Self::with_path(db_path).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, IngestError> {
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
            .map_err(|err| IngestError::StoreWrite(err.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), IngestError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|err| IngestError::StoreWrite(err.to_string()))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS uploads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'processing',
                error_message TEXT,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|err| IngestError::StoreWrite(err.to_string()))?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> StoredChunk {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Value>(&metadata_str)
            .unwrap_or_else(|_| Value::Object(Default::default()));

        StoredChunk {
            chunk_id: row.get("chunk_id"),
            content: row.get("content"),
            metadata,
        }
    }

    fn row_to_upload(row: &sqlx::sqlite::SqliteRow) -> Upload {
        let status: String = row.get("status");

        Upload {
            id: row.get("id"),
            filename: row.get("filename"),
            status: UploadStatus::parse(&status),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn store_chunks(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), IngestError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|err| IngestError::StoreWrite(err.to_string()))?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = serde_json::to_string(&chunk.metadata)
                .unwrap_or_else(|_| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO documents (chunk_id, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.content)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(|err| IngestError::StoreWrite(err.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|err| IngestError::StoreWrite(err.to_string()))?;
        Ok(())
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        k: usize,
    ) -> Result<Vec<RetrievalMatch>, IngestError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query("SELECT chunk_id, content, metadata, embedding FROM documents")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| IngestError::StoreQuery(err.to_string()))?;

        let mut scored: Vec<RetrievalMatch> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored);
                if score < threshold {
                    return None;
                }

                Some(RetrievalMatch {
                    chunk: Self::row_to_chunk(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn create_upload(&self, filename: &str) -> Result<i64, IngestError> {
        let result = sqlx::query("INSERT INTO uploads (filename, status) VALUES (?1, 'processing')")
            .bind(filename)
            .execute(&self.pool)
            .await
            .map_err(|err| IngestError::StoreWrite(err.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    async fn set_upload_status(
        &self,
        upload_id: i64,
        status: UploadStatus,
        error_message: Option<&str>,
    ) -> Result<(), IngestError> {
        if status == UploadStatus::Processing {
            return Err(IngestError::StoreWrite(
                "uploads can only move to a terminal status".to_string(),
            ));
        }

        let result = sqlx::query(
            "UPDATE uploads
             SET status = ?1,
                 error_message = ?2,
                 updated_at = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?3 AND status = 'processing'",
        )
        .bind(status.as_str())
        .bind(error_message)
        .bind(upload_id)
        .execute(&self.pool)
        .await
        .map_err(|err| IngestError::StoreWrite(err.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(IngestError::StoreWrite(format!(
                "upload {} not found or already terminal",
                upload_id
            )));
        }

        Ok(())
    }

    async fn get_upload(&self, upload_id: i64) -> Result<Option<Upload>, IngestError> {
        let row = sqlx::query(
            "SELECT id, filename, status, error_message, created_at, updated_at
             FROM uploads
             WHERE id = ?1",
        )
        .bind(upload_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| IngestError::StoreQuery(err.to_string()))?;

        Ok(row.as_ref().map(Self::row_to_upload))
    }

    async fn list_uploads(&self) -> Result<Vec<Upload>, IngestError> {
        let rows = sqlx::query(
            "SELECT id, filename, status, error_message, created_at, updated_at
             FROM uploads
             ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|err| IngestError::StoreQuery(err.to_string()))?;

        Ok(rows.iter().map(Self::row_to_upload).collect())
    }

    async fn count_chunks(&self) -> Result<usize, IngestError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| IngestError::StoreQuery(err.to_string()))?;

        Ok(count as usize)
    }
}
