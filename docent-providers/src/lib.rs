//! Model provider integrations for docent
//!
//! This crate provides abstractions and an OpenAI-compatible implementation
//! for chat completion and text embedding providers.

pub mod base;
pub mod openai;

pub use base::{
    EmbeddingProvider, LLMProvider, LLMResponse, LLMStreamEvent, Message, ProviderError,
    ProviderEventStream, ProviderResult,
};
pub use openai::OpenAIClient;
