//! Ingestion pipeline for one uploaded document.
//!
//! Stages run strictly in order: load, chunk, embed, store. Each stage is
//! an explicit `Result`; the first failure aborts the rest and a single
//! terminal step records the outcome on the upload row. A document with no
//! extractable text completes with zero work.

use std::sync::Arc;

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::chunker::{Chunk, Chunker};
use super::embedder::Embedder;
use super::loader;
use super::store::{StoredChunk, UploadStatus, VectorStore};
use crate::core::errors::IngestError;

pub struct IngestPipeline {
    store: Arc<dyn VectorStore>,
    embedder: Embedder,
    chunker: Chunker,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Embedder, chunker: Chunker) -> Self {
        Self {
            store,
            embedder,
            chunker,
        }
    }

    /// Runs the pipeline to a terminal upload status. Never returns an
    /// error: the HTTP caller was already acknowledged when the job was
    /// queued, so failures are recorded on the upload row and logged.
    pub async fn run(&self, upload_id: i64, filename: &str, bytes: Vec<u8>) {
        match self.process(upload_id, filename, bytes).await {
            Ok(chunk_count) => {
                tracing::info!(
                    "Ingested {} ({} chunks) for upload {}",
                    filename,
                    chunk_count,
                    upload_id
                );
                self.finish(upload_id, UploadStatus::Completed, None).await;
            }
            Err(err) => {
                tracing::warn!("Ingestion failed for upload {}: {}", upload_id, err);
                self.finish(upload_id, UploadStatus::Failed, Some(err.to_string()))
                    .await;
            }
        }
    }

    async fn finish(&self, upload_id: i64, status: UploadStatus, error_message: Option<String>) {
        if let Err(err) = self
            .store
            .set_upload_status(upload_id, status, error_message.as_deref())
            .await
        {
            tracing::error!(
                "Failed to record terminal status for upload {}: {}",
                upload_id,
                err
            );
        }
    }

    async fn process(
        &self,
        upload_id: i64,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<usize, IngestError> {
        tracing::debug!("Loading {} for upload {}", filename, upload_id);
        let segments = loader::load_document(bytes, filename).await?;
        if segments.is_empty() {
            return Ok(0);
        }

        tracing::debug!("Chunking {} segments for upload {}", segments.len(), upload_id);
        let chunks = self.chunker.chunk_segments(&segments);
        if chunks.is_empty() {
            return Ok(0);
        }

        tracing::debug!("Embedding {} chunks for upload {}", chunks.len(), upload_id);
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_many(&texts).await?;

        tracing::debug!("Storing {} chunks for upload {}", chunks.len(), upload_id);
        let items: Vec<(StoredChunk, Vec<f32>)> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| (to_stored_chunk(upload_id, filename, chunk), vector))
            .collect();

        let count = items.len();
        self.store.store_chunks(items).await?;
        Ok(count)
    }
}

/// Finalizes an in-memory chunk for persistence: attaches the upload-level
/// source filename and start offset to the metadata and derives a stable
/// chunk id from the chunk's position within the upload.
fn to_stored_chunk(upload_id: i64, filename: &str, chunk: Chunk) -> StoredChunk {
    let mut metadata = match chunk.metadata {
        Value::Object(map) => map,
        _ => Default::default(),
    };
    metadata.insert("source".to_string(), Value::from(filename));
    metadata.insert("start_offset".to_string(), Value::from(chunk.start_offset));

    let page = metadata.get("page").and_then(Value::as_u64).unwrap_or(0);
    let mut hasher = Sha256::new();
    hasher.update(upload_id.to_le_bytes());
    hasher.update(filename.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update(chunk.start_offset.to_le_bytes());
    let chunk_id = hex::encode(hasher.finalize());

    StoredChunk {
        chunk_id,
        content: chunk.content,
        metadata: Value::Object(metadata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::core::errors::ApiError;
    use crate::llm::types::ChatRequest;
    use crate::llm::LlmProvider;
    use crate::rag::chunker::ChunkerConfig;
    use crate::rag::sqlite::SqliteVectorStore;

    struct StubProvider;

    #[async_trait]
    impl LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(true)
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            Ok(String::new())
        }

        async fn embed(
            &self,
            inputs: &[String],
            _model_id: &str,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }
    }

    struct DownProvider;

    #[async_trait]
    impl LlmProvider for DownProvider {
        fn name(&self) -> &str {
            "down"
        }

        async fn health_check(&self) -> Result<bool, ApiError> {
            Ok(false)
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            Err(ApiError::Internal("connection refused".to_string()))
        }

        async fn embed(
            &self,
            _inputs: &[String],
            _model_id: &str,
        ) -> Result<Vec<Vec<f32>>, ApiError> {
            Err(ApiError::Internal("connection refused".to_string()))
        }
    }

    async fn test_store() -> Arc<SqliteVectorStore> {
        let tmp = std::env::temp_dir().join(format!("copilot-ingest-test-{}.db", uuid::Uuid::new_v4()));
        Arc::new(SqliteVectorStore::with_path(tmp).await.unwrap())
    }

    fn pipeline(store: Arc<SqliteVectorStore>, provider: Arc<dyn LlmProvider>) -> IngestPipeline {
        let embedder = Embedder::new(provider, "embed-model");
        let chunker = Chunker::new(ChunkerConfig {
            chunk_size: 1000,
            chunk_overlap: 200,
        });
        IngestPipeline::new(store, embedder, chunker)
    }

    #[tokio::test]
    async fn happy_path_completes_with_expected_chunks() {
        let store = test_store().await;
        let pipeline = pipeline(store.clone(), Arc::new(StubProvider));

        let upload_id = store.create_upload("notes.txt").await.unwrap();
        let text = "a".repeat(2400);
        pipeline.run(upload_id, "notes.txt", text.into_bytes()).await;

        let upload = store.get_upload(upload_id).await.unwrap().unwrap();
        assert_eq!(upload.status, UploadStatus::Completed);
        assert!(upload.error_message.is_none());
        assert_eq!(store.count_chunks().await.unwrap(), 3);

        // Every stored chunk carries the upload's filename and its offset.
        let matches = store
            .similarity_search(&[1.0, 0.0, 0.0], 0.9, 10)
            .await
            .unwrap();
        assert_eq!(matches.len(), 3);
        let mut offsets: Vec<u64> = matches
            .iter()
            .map(|m| m.chunk.metadata["start_offset"].as_u64().unwrap())
            .collect();
        offsets.sort_unstable();
        assert_eq!(offsets, vec![0, 800, 1600]);
        assert!(matches.iter().all(|m| m.chunk.source() == "notes.txt"));
    }

    #[tokio::test]
    async fn unreachable_embedding_service_fails_the_upload() {
        let store = test_store().await;
        let pipeline = pipeline(store.clone(), Arc::new(DownProvider));

        let upload_id = store.create_upload("notes.txt").await.unwrap();
        pipeline
            .run(upload_id, "notes.txt", b"some document text".to_vec())
            .await;

        let upload = store.get_upload(upload_id).await.unwrap().unwrap();
        assert_eq!(upload.status, UploadStatus::Failed);
        assert!(!upload.error_message.unwrap_or_default().is_empty());
        assert_eq!(store.count_chunks().await.unwrap(), 0);

        // The terminal write already happened; a second one is rejected.
        let second = store
            .set_upload_status(upload_id, UploadStatus::Completed, None)
            .await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn empty_document_completes_with_zero_chunks() {
        let store = test_store().await;
        let pipeline = pipeline(store.clone(), Arc::new(DownProvider));

        let upload_id = store.create_upload("empty.txt").await.unwrap();
        pipeline.run(upload_id, "empty.txt", Vec::new()).await;

        let upload = store.get_upload(upload_id).await.unwrap().unwrap();
        assert_eq!(upload.status, UploadStatus::Completed);
        assert_eq!(store.count_chunks().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unparseable_document_fails_with_format_error() {
        let store = test_store().await;
        let pipeline = pipeline(store.clone(), Arc::new(StubProvider));

        let upload_id = store.create_upload("broken.pdf").await.unwrap();
        pipeline
            .run(upload_id, "broken.pdf", b"not a pdf at all".to_vec())
            .await;

        let upload = store.get_upload(upload_id).await.unwrap().unwrap();
        assert_eq!(upload.status, UploadStatus::Failed);
        assert!(upload
            .error_message
            .unwrap_or_default()
            .contains("unsupported format"));
    }

    #[test]
    fn chunk_ids_are_stable_per_position() {
        let chunk = Chunk {
            content: "text".to_string(),
            start_offset: 800,
            metadata: serde_json::json!({}),
        };
        let a = to_stored_chunk(1, "notes.txt", chunk.clone());
        let b = to_stored_chunk(1, "notes.txt", chunk.clone());
        let c = to_stored_chunk(2, "notes.txt", chunk);

        assert_eq!(a.chunk_id, b.chunk_id);
        assert_ne!(a.chunk_id, c.chunk_id);
    }
}
