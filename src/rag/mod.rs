//! RAG (Retrieval-Augmented Generation) module.
//!
//! Ingestion side: `loader` turns uploaded bytes into text segments,
//! `chunker` windows them into overlapping chunks, `embedder` maps chunks to
//! vectors, and the `VectorStore` persists them. `ingest` drives the four
//! stages for one document and owns its upload's status; `queue` schedules
//! ingestion jobs on a bounded worker pool.
//!
//! Retrieval side: `context` embeds a query, runs similarity search, and
//! formats the ranked matches into a prompt context block.

pub mod chunker;
pub mod context;
pub mod embedder;
pub mod ingest;
pub mod loader;
pub mod queue;
pub mod sqlite;
pub mod store;

pub use chunker::{Chunker, ChunkerConfig};
pub use context::Retriever;
pub use embedder::Embedder;
pub use ingest::IngestPipeline;
pub use queue::{IngestJob, IngestQueue};
pub use sqlite::SqliteVectorStore;
pub use store::{RetrievalMatch, StoredChunk, Upload, UploadStatus, VectorStore};
