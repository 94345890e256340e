//! Error types for docent

use thiserror::Error;

/// The main error type for docent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Provider (LLM) errors
    #[error("Provider error: {0}")]
    Provider(String),

    /// Knowledge index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for docent operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
