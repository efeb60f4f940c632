//! Chat response assembly.
//!
//! Gates messages on the configured channel allow-list, builds the system
//! prompt from instructions, recent conversation memory and retrieved
//! document context, calls the provider, and records both turns. Memory and
//! retrieval failures degrade the prompt instead of failing the response.

use std::sync::Arc;

use crate::core::config::ConfigService;
use crate::core::errors::ApiError;
use crate::llm::types::{ChatMessage, ChatRequest};
use crate::llm::LlmProvider;
use crate::memory::MemoryStore;
use crate::rag::context::format_context;
use crate::rag::Retriever;

#[derive(Clone)]
pub struct ChatService {
    config: ConfigService,
    provider: Arc<dyn LlmProvider>,
    memory: MemoryStore,
    retriever: Retriever,
}

impl ChatService {
    pub fn new(
        config: ConfigService,
        provider: Arc<dyn LlmProvider>,
        memory: MemoryStore,
        retriever: Retriever,
    ) -> Self {
        Self {
            config,
            provider,
            memory,
            retriever,
        }
    }

    pub async fn respond(
        &self,
        channel_id: Option<&str>,
        message: &str,
    ) -> Result<String, ApiError> {
        let assistant = self.config.assistant();

        if !channel_allowed(&assistant.allowed_channels, channel_id) {
            return Err(ApiError::Forbidden);
        }

        let transcript = match self.memory.recent(assistant.memory_limit).await {
            Ok(messages) => messages
                .iter()
                .map(|m| format!("{}: {}", m.role, m.content))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(err) => {
                tracing::warn!("Failed to read conversation memory: {}", err);
                String::new()
            }
        };

        let rag = self.config.rag();
        let context = match self
            .retriever
            .retrieve(message, rag.similarity_threshold, rag.top_k)
            .await
        {
            Ok(matches) => {
                if !matches.is_empty() {
                    tracing::info!("Retrieved {} chunks for context", matches.len());
                }
                format_context(&matches)
            }
            Err(err) => {
                tracing::warn!("Retrieval failed, answering without context: {}", err);
                String::new()
            }
        };

        let system_prompt =
            compose_system_prompt(&assistant.system_instructions, &transcript, &context);
        let request = ChatRequest::new(vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user(message),
        ]);

        let llm = self.config.llm();
        let reply = self.provider.chat(request, &llm.chat_model).await?;

        if let Err(err) = self.memory.append("user", message).await {
            tracing::warn!("Failed to record user message: {}", err);
        }
        if let Err(err) = self.memory.append("assistant", &reply).await {
            tracing::warn!("Failed to record assistant reply: {}", err);
        }

        Ok(reply)
    }
}

/// Strict allow-list: a message is answered only when its channel is
/// configured. An empty list answers nowhere, so an unconfigured assistant
/// stays silent instead of replying everywhere.
fn channel_allowed(allowed: &[String], channel_id: Option<&str>) -> bool {
    match channel_id {
        Some(channel_id) => allowed.iter().any(|c| c == channel_id),
        None => false,
    }
}

fn compose_system_prompt(instructions: &str, transcript: &str, context: &str) -> String {
    let mut prompt = instructions.to_string();

    if !transcript.is_empty() {
        prompt.push_str("\n\nConversation History:\n");
        prompt.push_str(transcript);
    }

    if !context.is_empty() {
        prompt.push_str("\n\nContext from Knowledge Base:\n");
        prompt.push_str(context);
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn empty_allow_list_denies_everything() {
        assert!(!channel_allowed(&[], Some("general")));
        assert!(!channel_allowed(&[], None));
    }

    #[test]
    fn configured_channel_is_allowed() {
        let allowed = channels(&["general", "support"]);
        assert!(channel_allowed(&allowed, Some("general")));
        assert!(channel_allowed(&allowed, Some("support")));
    }

    #[test]
    fn unknown_or_missing_channel_is_denied() {
        let allowed = channels(&["general"]);
        assert!(!channel_allowed(&allowed, Some("random")));
        assert!(!channel_allowed(&allowed, None));
    }

    #[test]
    fn prompt_contains_sections_only_when_present() {
        let prompt = compose_system_prompt("Be helpful.", "", "");
        assert_eq!(prompt, "Be helpful.");

        let prompt = compose_system_prompt("Be helpful.", "user: hi", "- fact (Source: a.txt)");
        assert!(prompt.starts_with("Be helpful."));
        assert!(prompt.contains("Conversation History:\nuser: hi"));
        assert!(prompt.contains("Context from Knowledge Base:\n- fact (Source: a.txt)"));
    }
}
