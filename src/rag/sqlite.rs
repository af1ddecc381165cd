//! SQLite-backed RAG store implementation.
//!
//! Persistent vector store using SQLite for chunk rows and
//! brute-force cosine similarity for search.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{DocumentChunk, RagStore, ScoredChunk};
use crate::core::errors::RagError;
use crate::vector_math::rank_descending_by_cosine;

pub struct SqliteRagStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteRagStore {
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self, RagError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(RagError::index_unavailable)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(RagError::index_unavailable)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        tracing::debug!("Opened RAG store at {}", store.db_path.display());
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                chunk_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source_id TEXT NOT NULL DEFAULT '',
                chunk_index INTEGER NOT NULL DEFAULT 0,
                start_offset INTEGER NOT NULL DEFAULT 0,
                embedding BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::index_unavailable)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RagError::index_unavailable)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> DocumentChunk {
        let chunk_index: i64 = row.get("chunk_index");
        let start_offset: i64 = row.get("start_offset");

        DocumentChunk {
            chunk_id: row.get("chunk_id"),
            text: row.get("content"),
            source_id: row.get("source_id"),
            chunk_index: chunk_index.max(0) as usize,
            start_offset: start_offset.max(0) as usize,
        }
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn replace_snapshot(
        &self,
        embedding_model: &str,
        items: Vec<(DocumentChunk, Vec<f32>)>,
    ) -> Result<usize, RagError> {
        // Dropping `tx` on any early return rolls the whole swap back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(RagError::index_unavailable)?;

        sqlx::query("DELETE FROM rag_chunks")
            .execute(&mut *tx)
            .await
            .map_err(RagError::index_unavailable)?;

        for (chunk, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);

            sqlx::query(
                "INSERT INTO rag_chunks (chunk_id, content, source_id, chunk_index, start_offset, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&chunk.chunk_id)
            .bind(&chunk.text)
            .bind(&chunk.source_id)
            .bind(chunk.chunk_index as i64)
            .bind(chunk.start_offset as i64)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(RagError::index_unavailable)?;
        }

        sqlx::query(
            "INSERT OR REPLACE INTO rag_meta (key, value, updated_at)
             VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(embedding_model)
        .execute(&mut *tx)
        .await
        .map_err(RagError::index_unavailable)?;

        sqlx::query(
            "INSERT OR REPLACE INTO rag_meta (key, value, updated_at)
             VALUES ('built_at', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(RagError::index_unavailable)?;

        tx.commit().await.map_err(RagError::index_unavailable)?;
        Ok(items.len())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT chunk_id, content, source_id, chunk_index, start_offset, embedding
             FROM rag_chunks
             ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RagError::index_unavailable)?;

        let embeddings: Vec<Vec<f32>> = rows
            .iter()
            .map(|row| {
                let bytes: Vec<u8> = row.get("embedding");
                Self::deserialize_embedding(&bytes)
            })
            .collect();

        let ranked = rank_descending_by_cosine(query_embedding, &embeddings)?;
        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(idx, score)| ScoredChunk {
                chunk: Self::row_to_chunk(&rows[idx]),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, RagError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(RagError::index_unavailable)?;

        Ok(count as usize)
    }

    async fn embedding_model(&self) -> Result<Option<String>, RagError> {
        sqlx::query_scalar("SELECT value FROM rag_meta WHERE key = 'embedding_model'")
            .fetch_optional(&self.pool)
            .await
            .map_err(RagError::index_unavailable)
    }
}
