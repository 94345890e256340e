//! In-memory vector index with cosine-similarity search
//!
//! The index is session-scoped: built once at chat start, owned by that
//! session exclusively, and dropped with it.

use crate::errors::{IndexError, IndexResult};

/// A stored chunk with its embedding
#[derive(Debug, Clone)]
struct IndexEntry {
    embedding: Vec<f32>,
    text: String,
    file_name: String,
}

/// A retrieved fragment of a source document plus metadata
#[derive(Debug, Clone)]
pub struct Passage {
    /// Chunk text used to ground the answer
    pub text: String,
    /// Originating file name
    pub file_name: String,
    /// Cosine similarity against the query
    pub score: f32,
}

/// In-memory vector index over the session's document chunks
#[derive(Debug, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: Option<usize>,
}

impl VectorIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk embedding to the index.
    ///
    /// All vectors must share one dimension and contain only finite values;
    /// NaN or infinity would poison every similarity comparison.
    pub fn add(
        &mut self,
        embedding: Vec<f32>,
        text: impl Into<String>,
        file_name: impl Into<String>,
    ) -> IndexResult<()> {
        if embedding.is_empty() {
            return Err(IndexError::InvalidInput("empty embedding vector".to_string()));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::InvalidInput(
                "embedding contains NaN or infinite values".to_string(),
            ));
        }
        match self.dimension {
            Some(dim) if dim != embedding.len() => {
                return Err(IndexError::InvalidInput(format!(
                    "dimension mismatch: expected {}, got {}",
                    dim,
                    embedding.len()
                )));
            }
            None => self.dimension = Some(embedding.len()),
            _ => {}
        }

        self.entries.push(IndexEntry {
            embedding,
            text: text.into(),
            file_name: file_name.into(),
        });
        Ok(())
    }

    /// Number of chunks held by the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the `top_k` most similar passages for a query embedding,
    /// highest score first.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<Passage> {
        let mut results: Vec<Passage> = self
            .entries
            .iter()
            .map(|entry| Passage {
                text: entry.text.clone(),
                file_name: entry.file_name.clone(),
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        results
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-magnitude vectors rather than
/// panicking; a degenerate entry should lose the ranking, not kill the turn.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
