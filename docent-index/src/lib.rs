//! Knowledge-base loading and vector search for docent
//!
//! A session's knowledge index is built once at chat start: every document
//! in the fixed corpus directory is read, chunked, embedded, and held in an
//! in-memory vector store that answers cosine-similarity top-k queries.

pub mod chunk;
pub mod document;
pub mod errors;
pub mod loader;
pub mod store;

pub use document::Document;
pub use errors::IndexError;
pub use loader::{build_index, ChunkingConfig};
pub use store::{Passage, VectorIndex};
