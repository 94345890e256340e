//! The conversational chat engine
//!
//! One engine exists per session. Its configuration (prompt, retrieval
//! depth, memory budget) is fixed at construction and immutable for the
//! session's lifetime.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use docent_core::config::AssistantDefaults;
use docent_core::session::ChatMemory;
use docent_core::{Error, Result};
use docent_index::chunk::normalize_text;
use docent_index::{Passage, VectorIndex};
use docent_providers::{EmbeddingProvider, LLMProvider, Message, ProviderEventStream};

use crate::prompt::{context_block, SYSTEM_PROMPT};

/// Fixed engine configuration for one session
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: String,
    pub max_tokens: i32,
    pub temperature: f64,
    pub top_k: usize,
    pub memory_token_budget: usize,
}

impl From<&AssistantDefaults> for EngineConfig {
    fn from(defaults: &AssistantDefaults) -> Self {
        Self {
            model: defaults.model.clone(),
            max_tokens: defaults.max_tokens as i32,
            temperature: defaults.temperature as f64,
            top_k: defaults.top_k,
            memory_token_budget: defaults.memory_token_budget,
        }
    }
}

/// A dispatched streaming answer: the token stream plus the passage records
/// used to ground it. The passages are meant to be read once the stream is
/// exhausted.
pub struct StreamedReply {
    pub stream: ProviderEventStream,
    pub sources: Vec<Passage>,
}

impl std::fmt::Debug for StreamedReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamedReply")
            .field("stream", &"<ProviderEventStream>")
            .field("sources", &self.sources)
            .finish()
    }
}

/// Retrieval-grounded chat engine owning one session's index and memory
pub struct ChatEngine {
    provider: Arc<dyn LLMProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    config: EngineConfig,
    memory: Mutex<ChatMemory>,
}

impl ChatEngine {
    /// Create an engine over a freshly built session index
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: VectorIndex,
        config: EngineConfig,
    ) -> Self {
        let memory = Mutex::new(ChatMemory::new(config.memory_token_budget));
        Self {
            provider,
            embedder,
            index,
            config,
            memory,
        }
    }

    /// Dispatch one streaming query.
    ///
    /// Retrieves the `top_k` most similar passages, assembles the prompt
    /// (system prompt, retrieved context, bounded history, user message),
    /// and returns the provider's token stream together with the passages.
    pub async fn stream_chat(&self, text: &str) -> Result<StreamedReply> {
        let query_embedding = self
            .embedder
            .embed(&normalize_text(text))
            .await
            .map_err(|e| Error::Provider(e.to_string()))?;
        let sources = self.index.search(&query_embedding, self.config.top_k);
        debug!(
            "Retrieved {} passages for query ({} chars)",
            sources.len(),
            text.len()
        );

        let mut messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::system(context_block(&sources)),
        ];
        {
            let memory = self.memory.lock();
            for msg in memory.messages() {
                messages.push(Message {
                    role: msg.role.clone(),
                    content: msg.content.clone(),
                });
            }
        }
        messages.push(Message::user(text));

        let stream = self
            .provider
            .chat_stream(
                messages,
                Some(self.config.model.clone()),
                self.config.max_tokens,
                self.config.temperature,
            )
            .await
            .map_err(|e| Error::Provider(e.to_string()))?;

        Ok(StreamedReply { stream, sources })
    }

    /// Record a finished turn into the bounded memory
    pub fn record_turn(&self, user: &str, assistant: &str) {
        let mut memory = self.memory.lock();
        memory.push("user", user);
        memory.push("assistant", assistant);
    }

    /// Number of messages currently held in memory
    pub fn memory_len(&self) -> usize {
        self.memory.lock().len()
    }

    /// The fixed engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
