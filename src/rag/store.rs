//! RagStore trait: abstract interface for chunk storage backends.
//!
//! The index builds on top of this: it owns embedding and chunking, the
//! store only persists vectors and answers similarity searches.

use async_trait::async_trait;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::errors::RagError;

/// A unit of source-document text stored for retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// SHA-256 hex over source id, chunk index and text.
    pub chunk_id: String,
    pub text: String,
    /// Originating document identifier (file name).
    pub source_id: String,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
    /// Character offset in the original document.
    pub start_offset: usize,
}

impl DocumentChunk {
    pub fn new(
        text: impl Into<String>,
        source_id: impl Into<String>,
        chunk_index: usize,
        start_offset: usize,
    ) -> Self {
        let text = text.into();
        let source_id = source_id.into();
        let chunk_id = chunk_hash(&source_id, chunk_index, &text);
        Self {
            chunk_id,
            text,
            source_id,
            chunk_index,
            start_offset,
        }
    }
}

fn chunk_hash(source_id: &str, chunk_index: usize, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source_id.as_bytes());
    hasher.update(chunk_index.to_le_bytes());
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

/// Rejects a snapshot that would store the same chunk id twice.
pub(crate) fn ensure_unique_chunk_ids(
    items: &[(DocumentChunk, Vec<f32>)],
) -> Result<(), RagError> {
    let mut seen = HashSet::with_capacity(items.len());
    for (chunk, _) in items {
        if !seen.insert(chunk.chunk_id.as_str()) {
            return Err(RagError::IndexUnavailable(format!(
                "duplicate chunk id {} from {}",
                chunk.chunk_id, chunk.source_id
            )));
        }
    }
    Ok(())
}

#[async_trait]
pub trait RagStore: Send + Sync {
    /// Atomically swap the stored snapshot for `items` embedded with
    /// `embedding_model`. On error the previous snapshot and model stay in
    /// place. Duplicate chunk ids are rejected. Returns the stored count.
    ///
    /// A store that has been through this at least once counts as built.
    async fn replace_snapshot(
        &self,
        embedding_model: &str,
        items: Vec<(DocumentChunk, Vec<f32>)>,
    ) -> Result<usize, RagError>;

    /// Up to `limit` chunks most similar to `query_embedding`, best first.
    /// Equal scores keep insertion order.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RagError>;

    async fn count(&self) -> Result<usize, RagError>;

    /// Embedding model of the current snapshot, `None` if never built.
    async fn embedding_model(&self) -> Result<Option<String>, RagError>;
}
