use std::sync::Arc;

use crate::core::errors::IngestError;
use crate::llm::LlmProvider;

/// Maps text to fixed-length vectors via the configured provider's
/// embeddings endpoint. Vector dimensionality is determined by the model.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl Embedder {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Bulk embedding for the ingestion path: one vector per input text,
    /// in input order.
    pub async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self
            .provider
            .embed(texts, &self.model)
            .await
            .map_err(|err| IngestError::EmbeddingService(err.to_string()))?;

        if vectors.len() != texts.len() {
            return Err(IngestError::EmbeddingService(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(vectors)
    }

    /// Single embedding for the retrieval path.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, IngestError> {
        let mut vectors = self.embed_many(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| IngestError::EmbeddingService("provider returned no vector".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::core::errors::ApiError;
    use crate::llm::types::ChatRequest;

    struct StubProvider {
        vectors_per_input: usize,
    }

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
            Ok(vec![vec![1.0, 0.0]; inputs.len() * self.vectors_per_input])
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

    #[tokio::test]
    async fn embed_many_returns_one_vector_per_text() {
        let embedder = Embedder::new(Arc::new(StubProvider { vectors_per_input: 1 }), "embed-model");

        let texts = vec!["a".to_string(), "b".to_string()];
        let vectors = embedder.embed_many(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
    }

    #[tokio::test]
    async fn embed_many_with_no_texts_skips_the_remote_call() {
        let embedder = Embedder::new(Arc::new(DownProvider), "embed-model");
        assert!(embedder.embed_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn vector_count_mismatch_is_an_error() {
        let embedder = Embedder::new(Arc::new(StubProvider { vectors_per_input: 2 }), "embed-model");

        let err = embedder.embed_many(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, IngestError::EmbeddingService(_)));
    }

    #[tokio::test]
    async fn remote_failure_maps_to_embedding_service_error() {
        let embedder = Embedder::new(Arc::new(DownProvider), "embed-model");

        let err = embedder.embed_one("query").await.unwrap_err();
        assert!(matches!(err, IngestError::EmbeddingService(_)));
    }
}
