//! Building a session's knowledge index
//!
//! Read the corpus directory, chunk every document, embed the chunks in one
//! batch, and load the vectors into an in-memory index. This runs once per
//! session start and is deliberately not cached across sessions.

use std::path::Path;
use tracing::info;

use docent_providers::EmbeddingProvider;

use crate::chunk::{chunk_text, normalize_text};
use crate::document::read_documents;
use crate::errors::{IndexError, IndexResult};
use crate::store::VectorIndex;

/// Chunking parameters for index construction
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 32,
        }
    }
}

/// Build a vector index over every document under `dir`.
///
/// Blocking for the duration of the embedding call; a failure here is fatal
/// for the session that attempted the load.
pub async fn build_index(
    embedder: &dyn EmbeddingProvider,
    dir: impl AsRef<Path>,
    chunking: ChunkingConfig,
) -> IndexResult<VectorIndex> {
    let dir = dir.as_ref();
    let documents = read_documents(dir)?;

    let mut chunks: Vec<(String, String)> = Vec::new();
    for document in &documents {
        for chunk in chunk_text(&document.text, chunking.chunk_size, chunking.chunk_overlap) {
            chunks.push((chunk, document.file_name.clone()));
        }
    }

    let normalized: Vec<String> = chunks
        .iter()
        .map(|(text, _)| normalize_text(text))
        .collect();
    let inputs: Vec<&str> = normalized.iter().map(String::as_str).collect();

    let embeddings = embedder
        .embed_batch(&inputs)
        .await
        .map_err(|e| IndexError::Embedding(e.to_string()))?;
    if embeddings.len() != chunks.len() {
        return Err(IndexError::Embedding(format!(
            "expected {} embeddings, got {}",
            chunks.len(),
            embeddings.len()
        )));
    }

    let mut index = VectorIndex::new();
    for (embedding, (text, file_name)) in embeddings.into_iter().zip(chunks) {
        index.add(embedding, text, file_name)?;
    }

    info!(
        "Indexed {} documents ({} chunks) from {}",
        documents.len(),
        index.len(),
        dir.display()
    );

    Ok(index)
}
