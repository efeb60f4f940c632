//! Typed views over the merged YAML configuration.
//!
//! Each struct maps one top-level config section; unknown or malformed
//! sections fall back to the defaults below so a partially written config
//! never takes the service down.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantSettings {
    /// System instructions prepended to every chat prompt.
    pub system_instructions: String,
    /// Channels the assistant answers in. Empty means answer nowhere.
    pub allowed_channels: Vec<String>,
    /// How many recent memory messages feed the prompt.
    pub memory_limit: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            system_instructions: "You are a helpful assistant.".to_string(),
            allowed_channels: Vec::new(),
            memory_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible API base URL.
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in characters.
    pub chunk_overlap: usize,
    /// Maximum matches returned by retrieval.
    pub top_k: usize,
    /// Minimum cosine similarity for a retrieval match.
    pub similarity_threshold: f32,
    /// Bounded ingest queue capacity.
    pub queue_capacity: usize,
    /// Ingest worker task count.
    pub workers: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            similarity_threshold: 0.5,
            queue_capacity: 32,
            workers: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rag_defaults_match_documented_values() {
        let rag = RagSettings::default();
        assert_eq!(rag.chunk_size, 1000);
        assert_eq!(rag.chunk_overlap, 200);
        assert_eq!(rag.top_k, 5);
        assert!((rag.similarity_threshold - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn sections_deserialize_with_partial_fields() {
        let value = serde_json::json!({ "chunk_size": 500 });
        let rag: RagSettings = serde_json::from_value(value).unwrap();
        assert_eq!(rag.chunk_size, 500);
        assert_eq!(rag.chunk_overlap, 200);
    }

    #[test]
    fn assistant_defaults_deny_all_channels() {
        let assistant = AssistantSettings::default();
        assert!(assistant.allowed_channels.is_empty());
        assert_eq!(assistant.memory_limit, 10);
    }
}
