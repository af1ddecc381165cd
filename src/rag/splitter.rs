//! Splits raw documents into overlapping chunks for embedding.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::loader::Document;
use super::store::DocumentChunk;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Chunks of every document in order. A chunk whose id was already
    /// produced (same source, position and text) is dropped.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<DocumentChunk> {
        let mut seen = HashSet::new();
        documents
            .iter()
            .flat_map(|doc| self.split(&doc.text, &doc.source_id))
            .filter(|chunk| seen.insert(chunk.chunk_id.clone()))
            .collect()
    }

    /// Split text into overlapping chunks, preferring sentence boundaries.
    pub fn split(&self, text: &str, source_id: &str) -> Vec<DocumentChunk> {
        let chunk_size = self.config.chunk_size.max(1);
        let overlap = self.config.chunk_overlap.min(chunk_size - 1);

        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total_chars {
            let hard_end = (start + chunk_size).min(total_chars);
            let end = if hard_end < total_chars {
                start + sentence_cut(&chars[start..hard_end])
            } else {
                hard_end
            };

            let chunk_text: String = chars[start..end].iter().collect();
            let trimmed = chunk_text.trim();
            if !trimmed.is_empty() {
                chunks.push(DocumentChunk::new(trimmed, source_id, chunks.len(), start));
            }

            if end >= total_chars {
                break;
            }
            start = end.saturating_sub(overlap).max(start + 1);
        }

        chunks
    }
}

/// Length of the window up to the last sentence ending found in its final
/// 20%, or the whole window when there is none.
fn sentence_cut(window: &[char]) -> usize {
    let search_start = (window.len() * 80) / 100;
    for i in (search_start..window.len().saturating_sub(1)).rev() {
        if matches!(window[i], '.' | '!' | '?') && window[i + 1].is_whitespace() {
            return i + 2;
        }
    }
    window.len()
}
