//! Error types for knowledge-base operations

use thiserror::Error;

/// Errors that can occur while building or querying a knowledge index
#[derive(Debug, Error)]
pub enum IndexError {
    /// The documents directory could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The documents directory yielded no indexable content
    #[error("Empty corpus: {0}")]
    EmptyCorpus(String),

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Invalid input (bad vector, dimension mismatch)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
