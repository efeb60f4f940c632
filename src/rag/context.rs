//! Retrieval and prompt-context formatting.
//!
//! Embeds a query, runs similarity search against the vector store, and
//! renders the ranked matches as a context block attributing each match to
//! its source filename.

use std::sync::Arc;

use super::embedder::Embedder;
use super::store::{RetrievalMatch, VectorStore};
use crate::core::errors::IngestError;

#[derive(Clone)]
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    embedder: Embedder,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Embedder) -> Self {
        Self { store, embedder }
    }

    /// Up to `k` stored chunks scoring at least `threshold` against the
    /// query, best first. Errors propagate to the caller, which is expected
    /// to degrade to "no context" rather than fail the response.
    pub async fn retrieve(
        &self,
        query: &str,
        threshold: f32,
        k: usize,
    ) -> Result<Vec<RetrievalMatch>, IngestError> {
        let query_embedding = self.embedder.embed_one(query).await?;
        self.store
            .similarity_search(&query_embedding, threshold, k)
            .await
    }
}

/// Renders matches as a bulleted context block, one line per chunk with its
/// source filename. Empty input renders as an empty string.
pub fn format_context(matches: &[RetrievalMatch]) -> String {
    matches
        .iter()
        .map(|m| format!("- {} (Source: {})", m.chunk.content.trim(), m.chunk.source()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::rag::store::StoredChunk;

    fn make_match(content: &str, source: Option<&str>, score: f32) -> RetrievalMatch {
        let metadata = match source {
            Some(source) => json!({ "source": source }),
            None => json!({}),
        };
        RetrievalMatch {
            chunk: StoredChunk {
                chunk_id: "c".to_string(),
                content: content.to_string(),
                metadata,
            },
            score,
        }
    }

    #[test]
    fn formats_one_line_per_match_with_source() {
        let matches = vec![
            make_match("Cats purr.", Some("cats.txt"), 0.9),
            make_match("Dogs bark.", Some("dogs.pdf"), 0.8),
        ];

        let block = format_context(&matches);

        assert_eq!(
            block,
            "- Cats purr. (Source: cats.txt)\n- Dogs bark. (Source: dogs.pdf)"
        );
    }

    #[test]
    fn missing_source_is_attributed_as_unknown() {
        let block = format_context(&[make_match("Text.", None, 0.7)]);
        assert_eq!(block, "- Text. (Source: unknown)");
    }

    #[test]
    fn no_matches_renders_empty() {
        assert_eq!(format_context(&[]), "");
    }
}
