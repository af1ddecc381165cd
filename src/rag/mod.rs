//! Retrieval subsystem.
//!
//! - `loader`: reads the plain-text document collection
//! - `splitter`: cuts documents into overlapping chunks
//! - `embedder`: text → vector (`HashingEmbedder` offline, OpenAI over HTTP)
//! - `store`: persistence behind `RagStore` (SQLite or in-memory)
//! - `index`: `EmbeddingIndex`, the query/build surface used by the pipeline

mod embedder;
mod index;
mod loader;
mod memory;
mod splitter;
mod sqlite;
mod store;

pub use embedder::{Embedder, HashingEmbedder};
pub use index::{EmbeddingIndex, IndexStats, VectorIndex};
pub use loader::{load_documents, Document};
pub use memory::MemoryRagStore;
pub use splitter::{SplitterConfig, TextSplitter};
pub use sqlite::SqliteRagStore;
pub use store::{DocumentChunk, RagStore, ScoredChunk};
