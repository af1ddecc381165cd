//! Embedding index: text in, nearest chunks out.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::embedder::Embedder;
use super::loader::Document;
use super::splitter::TextSplitter;
use super::store::{DocumentChunk, RagStore, ScoredChunk};
use crate::core::errors::RagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
}

#[async_trait]
pub trait EmbeddingIndex: Send + Sync {
    /// At most `k` chunks, most similar first. Deterministic for a fixed
    /// snapshot. Fails with `IndexEmpty` before the first successful build.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>, RagError>;

    /// Replace the snapshot with chunks of `documents`.
    async fn build(&self, documents: &[Document]) -> Result<IndexStats, RagError>;

    async fn is_built(&self) -> Result<bool, RagError>;
}

pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn RagStore>,
    splitter: TextSplitter,
    embed_batch_size: usize,
}

impl VectorIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn RagStore>) -> Self {
        Self {
            embedder,
            store,
            splitter: TextSplitter::default(),
            embed_batch_size: 64,
        }
    }

    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn with_embed_batch_size(mut self, batch_size: usize) -> Self {
        self.embed_batch_size = batch_size.max(1);
        self
    }

    async fn embed_chunks(&self, chunks: &[DocumentChunk]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.embed_batch_size) {
            let inputs: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self
                .embedder
                .embed(&inputs)
                .await
                .map_err(|err| RagError::IndexUnavailable(format!("embedding failed: {}", err)))?;
            if vectors.len() != inputs.len() {
                return Err(RagError::IndexUnavailable(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    inputs.len()
                )));
            }
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingIndex for VectorIndex {
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>, RagError> {
        let model = self.store.embedding_model().await?.ok_or(RagError::IndexEmpty)?;
        if model != self.embedder.model_id() {
            return Err(RagError::IndexUnavailable(format!(
                "index was built with embedding model '{}' but '{}' is configured; rebuild the index",
                model,
                self.embedder.model_id()
            )));
        }

        if k == 0 || self.store.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(&[text.to_string()])
            .await
            .map_err(|err| RagError::IndexUnavailable(format!("query embedding failed: {}", err)))?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::IndexUnavailable("embedder returned no vector".to_string()))?;

        let results = self.store.search(&query_embedding, k).await?;
        tracing::debug!("Index query returned {} chunks (k={})", results.len(), k);
        Ok(results)
    }

    async fn build(&self, documents: &[Document]) -> Result<IndexStats, RagError> {
        let chunks = self.splitter.split_documents(documents);

        // Embed everything first; the store swap below is all-or-nothing.
        let embeddings = self.embed_chunks(&chunks).await?;

        let stored = self
            .store
            .replace_snapshot(
                self.embedder.model_id(),
                chunks.into_iter().zip(embeddings).collect(),
            )
            .await?;
        let stats = IndexStats {
            documents: documents.len(),
            chunks: stored,
        };

        tracing::info!(
            "Built index with {} chunks from {} documents (model: {})",
            stats.chunks,
            stats.documents,
            self.embedder.model_id()
        );
        Ok(stats)
    }

    async fn is_built(&self) -> Result<bool, RagError> {
        Ok(self.store.embedding_model().await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::rag::embedder::HashingEmbedder;
    use crate::rag::memory::MemoryRagStore;
    use crate::rag::splitter::SplitterConfig;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn model_id(&self) -> &str {
            "hashing-256"
        }

        async fn embed(&self, _inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Err(LlmError::Unreachable("connection refused".to_string()))
        }
    }

    /// Delegates to a memory store but refuses every snapshot swap once armed.
    struct FlakyStore {
        inner: MemoryRagStore,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl RagStore for FlakyStore {
        async fn replace_snapshot(
            &self,
            embedding_model: &str,
            items: Vec<(DocumentChunk, Vec<f32>)>,
        ) -> Result<usize, RagError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(RagError::IndexUnavailable("disk full".to_string()));
            }
            self.inner.replace_snapshot(embedding_model, items).await
        }

        async fn search(
            &self,
            query_embedding: &[f32],
            limit: usize,
        ) -> Result<Vec<ScoredChunk>, RagError> {
            self.inner.search(query_embedding, limit).await
        }

        async fn count(&self) -> Result<usize, RagError> {
            self.inner.count().await
        }

        async fn embedding_model(&self) -> Result<Option<String>, RagError> {
            self.inner.embedding_model().await
        }
    }

    fn hashing_index(store: Arc<MemoryRagStore>) -> VectorIndex {
        VectorIndex::new(Arc::new(HashingEmbedder::new(256)), store)
    }

    fn energy_docs() -> Vec<Document> {
        vec![
            Document::new(
                "Renewable energy benefits: solar and wind reduce emissions.",
                "energy.txt",
            ),
            Document::new("Bread needs flour, water, salt and yeast.", "baking.txt"),
            Document::new("Electric trains use less energy than cars.", "transport.txt"),
        ]
    }

    #[tokio::test]
    async fn query_before_build_is_index_empty() {
        let index = hashing_index(Arc::new(MemoryRagStore::new()));
        assert!(!index.is_built().await.unwrap());

        let err = index.query("anything", 2).await.unwrap_err();
        assert!(matches!(err, RagError::IndexEmpty));
    }

    #[tokio::test]
    async fn build_then_query_returns_best_match_first() {
        let index = hashing_index(Arc::new(MemoryRagStore::new()));
        let stats = index.build(&energy_docs()).await.unwrap();
        assert_eq!(stats, IndexStats { documents: 3, chunks: 3 });

        let results = index
            .query("What are the benefits of renewable energy?", 2)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.source_id, "energy.txt");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn query_is_deterministic() {
        let index = hashing_index(Arc::new(MemoryRagStore::new()));
        index.build(&energy_docs()).await.unwrap();

        let first = index.query("how do trains save energy", 2).await.unwrap();
        let second = index.query("how do trains save energy", 2).await.unwrap();
        let ids = |r: &[ScoredChunk]| r.iter().map(|c| c.chunk.chunk_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn built_but_empty_index_returns_no_chunks() {
        let index = hashing_index(Arc::new(MemoryRagStore::new()));
        let stats = index.build(&[Document::new("   ", "blank.txt")]).await.unwrap();
        assert_eq!(stats.chunks, 0);

        assert!(index.is_built().await.unwrap());
        assert!(index.query("what is this", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rebuild_replaces_previous_snapshot() {
        let store = Arc::new(MemoryRagStore::new());
        let index = hashing_index(store.clone());
        index.build(&energy_docs()).await.unwrap();
        index
            .build(&[Document::new("Only one document now.", "one.txt")])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn model_mismatch_is_index_unavailable() {
        let store = Arc::new(MemoryRagStore::new());
        hashing_index(store.clone()).build(&energy_docs()).await.unwrap();

        let other = VectorIndex::new(Arc::new(HashingEmbedder::new(128)), store);
        let err = other.query("energy", 2).await.unwrap_err();
        assert!(matches!(err, RagError::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn embedder_failure_during_build_keeps_old_snapshot() {
        let store = Arc::new(MemoryRagStore::new());
        hashing_index(store.clone()).build(&energy_docs()).await.unwrap();

        let failing = VectorIndex::new(Arc::new(FailingEmbedder), store.clone());
        let err = failing.build(&energy_docs()).await.unwrap_err();
        assert!(matches!(err, RagError::IndexUnavailable(_)));
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn store_failure_during_rebuild_keeps_old_snapshot_queryable() {
        let store = Arc::new(FlakyStore {
            inner: MemoryRagStore::new(),
            fail_writes: AtomicBool::new(false),
        });
        let index = VectorIndex::new(Arc::new(HashingEmbedder::new(256)), store.clone());
        index.build(&energy_docs()).await.unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = index
            .build(&[Document::new("Replacement text.", "new.txt")])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::IndexUnavailable(_)));

        assert!(index.is_built().await.unwrap());
        let results = index
            .query("What are the benefits of renewable energy?", 3)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.source_id, "energy.txt");
    }

    #[tokio::test]
    async fn repeated_documents_are_counted_once() {
        let store = Arc::new(MemoryRagStore::new());
        let index = hashing_index(store.clone());
        let doc = Document::new("Solar panels convert sunlight.", "energy.txt");

        let stats = index.build(&[doc.clone(), doc]).await.unwrap();
        assert_eq!(stats, IndexStats { documents: 2, chunks: 1 });
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn embedder_failure_during_query_is_index_unavailable() {
        let store = Arc::new(MemoryRagStore::new());
        hashing_index(store.clone()).build(&energy_docs()).await.unwrap();

        let failing = VectorIndex::new(Arc::new(FailingEmbedder), store);
        let err = failing.query("energy", 2).await.unwrap_err();
        assert!(matches!(err, RagError::IndexUnavailable(_)));
    }

    #[tokio::test]
    async fn small_batches_embed_every_chunk() {
        let store = Arc::new(MemoryRagStore::new());
        let index = hashing_index(store.clone())
            .with_splitter(TextSplitter::new(SplitterConfig {
                chunk_size: 20,
                chunk_overlap: 0,
            }))
            .with_embed_batch_size(2);

        let stats = index
            .build(&[Document::new("one two three four five six seven eight nine ten", "n.txt")])
            .await
            .unwrap();
        assert!(stats.chunks > 2);
        assert_eq!(store.count().await.unwrap(), stats.chunks);
    }
}
