//! Reads the plain-text document collection from disk.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

/// A raw document handed to the index at build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub source_id: String,
}

impl Document {
    pub fn new(text: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: source_id.into(),
        }
    }
}

/// Load every file in `dir` (non-recursive) whose extension is in
/// `extensions`, ordered by file name. The file name becomes the source id.
pub fn load_documents(dir: &Path, extensions: &[String]) -> Result<Vec<Document>, RagError> {
    if !dir.is_dir() {
        return Err(RagError::NoDocuments(dir.to_path_buf()));
    }

    let mut paths: Vec<_> = fs::read_dir(dir)
        .map_err(RagError::internal)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_allowed_extension(path, extensions))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("Skipping unreadable document {}: {}", path.display(), err);
                continue;
            }
        };
        let source_id = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        documents.push(Document { text, source_id });
    }

    if documents.is_empty() {
        return Err(RagError::NoDocuments(dir.to_path_buf()));
    }

    tracing::info!("Loaded {} documents from {}", documents.len(), dir.display());
    Ok(documents)
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}
