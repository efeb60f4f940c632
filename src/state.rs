use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::chat::ChatService;
use crate::core::config::{AppPaths, ConfigService};
use crate::core::security::{init_admin_token, AdminToken};
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::memory::MemoryStore;
use crate::rag::{
    Chunker, ChunkerConfig, Embedder, IngestPipeline, IngestQueue, Retriever, SqliteVectorStore,
    VectorStore,
};

/// Explicitly constructed application context. Built once at process start
/// and shared behind an `Arc`; components receive their handles from here
/// instead of reaching for globals.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub admin_token: AdminToken,
    pub memory: MemoryStore,
    pub provider: Arc<dyn LlmProvider>,
    pub rag_store: Arc<dyn VectorStore>,
    pub retriever: Retriever,
    pub chat: ChatService,
    pub ingest_queue: IngestQueue,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        let admin_token = init_admin_token(&paths);

        let memory = MemoryStore::new(paths.db_path.clone()).await?;
        let rag_store: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(&paths).await?);

        let llm = config.llm();
        let provider: Arc<dyn LlmProvider> =
            Arc::new(OpenAiProvider::new(llm.base_url, llm.api_key));

        let rag = config.rag();
        let embedder = Embedder::new(provider.clone(), llm.embedding_model);
        let chunker = Chunker::new(ChunkerConfig {
            chunk_size: rag.chunk_size,
            chunk_overlap: rag.chunk_overlap,
        });

        let pipeline = Arc::new(IngestPipeline::new(
            rag_store.clone(),
            embedder.clone(),
            chunker,
        ));
        let ingest_queue = IngestQueue::start(pipeline, rag.queue_capacity, rag.workers.max(1));

        let retriever = Retriever::new(rag_store.clone(), embedder);
        let chat = ChatService::new(
            config.clone(),
            provider.clone(),
            memory.clone(),
            retriever.clone(),
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            admin_token,
            memory,
            provider,
            rag_store,
            retriever,
            chat,
            ingest_queue,
            started_at: Utc::now(),
        }))
    }
}
