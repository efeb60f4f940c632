//! VectorStore trait — abstract interface for the persisted RAG store.
//!
//! Owns the two persisted tables: `documents` (chunk records with
//! embeddings) and `uploads` (ingestion job status rows). The primary
//! implementation is `SqliteVectorStore` in the `sqlite` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::IngestError;

/// Status of one document's ingestion job. Transitions only from
/// `Processing` to exactly one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Processing,
        }
    }
}

/// One tracked document upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: i64,
    pub filename: String,
    pub status: UploadStatus,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A persisted chunk record: content plus metadata (source filename, start
/// offset, and loader fields such as the page number).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub content: String,
    pub metadata: serde_json::Value,
}

impl StoredChunk {
    /// The source filename recorded in the chunk metadata.
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    }
}

/// Result of a similarity search: a chunk and its cosine score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub chunk: StoredChunk,
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persists chunks with their embeddings in one atomic batch. Called at
    /// most once per ingested document.
    async fn store_chunks(
        &self,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), IngestError>;

    /// Up to `k` chunks with cosine score >= `threshold`, best first. An
    /// empty result is a valid outcome, not an error.
    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        threshold: f32,
        k: usize,
    ) -> Result<Vec<RetrievalMatch>, IngestError>;

    /// Creates an upload row with status `processing` and returns its id.
    async fn create_upload(&self, filename: &str) -> Result<i64, IngestError>;

    /// Sole mutator of upload status. Only terminal statuses are accepted,
    /// and only an upload still in `processing` can be moved.
    async fn set_upload_status(
        &self,
        upload_id: i64,
        status: UploadStatus,
        error_message: Option<&str>,
    ) -> Result<(), IngestError>;

    async fn get_upload(&self, upload_id: i64) -> Result<Option<Upload>, IngestError>;

    async fn list_uploads(&self) -> Result<Vec<Upload>, IngestError>;

    /// Total persisted chunk count.
    async fn count_chunks(&self) -> Result<usize, IngestError>;
}
