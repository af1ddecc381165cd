//! In-process RAG store.
//!
//! Holds every vector in memory behind a tokio `RwLock`; nothing survives
//! the process. Used by tests and for ephemeral runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{ensure_unique_chunk_ids, DocumentChunk, RagStore, ScoredChunk};
use crate::core::errors::RagError;
use crate::vector_math::rank_descending_by_cosine;

#[derive(Default)]
struct Snapshot {
    embedding_model: Option<String>,
    chunks: Vec<DocumentChunk>,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Default)]
pub struct MemoryRagStore {
    inner: RwLock<Snapshot>,
}

impl MemoryRagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RagStore for MemoryRagStore {
    async fn replace_snapshot(
        &self,
        embedding_model: &str,
        items: Vec<(DocumentChunk, Vec<f32>)>,
    ) -> Result<usize, RagError> {
        ensure_unique_chunk_ids(&items)?;

        let (chunks, embeddings): (Vec<_>, Vec<_>) = items.into_iter().unzip();
        let stored = chunks.len();
        let next = Snapshot {
            embedding_model: Some(embedding_model.to_string()),
            chunks,
            embeddings,
        };

        *self.inner.write().await = next;
        Ok(stored)
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        let guard = self.inner.read().await;
        if guard.chunks.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let ranked = rank_descending_by_cosine(query_embedding, &guard.embeddings)?;
        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(idx, score)| ScoredChunk {
                chunk: guard.chunks[idx].clone(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.inner.read().await.chunks.len())
    }

    async fn embedding_model(&self) -> Result<Option<String>, RagError> {
        Ok(self.inner.read().await.embedding_model.clone())
    }
}
