//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for docent
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Shared login credentials for the chat gateway
    pub auth: AuthConfig,
    /// Assistant configuration
    pub assistant: AssistantConfig,
    /// Knowledge base configuration
    pub knowledge: KnowledgeConfig,
    /// Provider configuration
    pub providers: ProvidersConfig,
    /// Gateway configuration
    pub gateway: GatewayConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Shared credential pair checked by the credential gate.
///
/// A single (username, password) pair guards the whole deployment; there is
/// no per-user account model.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AssistantConfig {
    /// Default assistant settings
    pub defaults: AssistantDefaults,
}

/// Default assistant settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantDefaults {
    /// Chat completion model
    pub model: String,
    /// Embedding model
    pub embed_model: String,
    /// Maximum completion tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Number of most similar passages retrieved per query
    pub top_k: usize,
    /// Token budget for the bounded conversational memory
    pub memory_token_budget: usize,
}

impl Default for AssistantDefaults {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            embed_model: "text-embedding-3-small".to_string(),
            max_tokens: 2048,
            temperature: 0.1,
            top_k: 3,
            memory_token_budget: 2048,
        }
    }
}

/// Knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Directory holding the source documents (read-only at runtime)
    #[serde(default = "default_knowledge_dir")]
    pub dir: String,
    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_knowledge_dir() -> String {
    "./data".to_string()
}
fn default_chunk_size() -> usize {
    1024
}
fn default_chunk_overlap() -> usize {
    32
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: default_knowledge_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
}

/// Individual provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base: Option<String>,
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    18890
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}
