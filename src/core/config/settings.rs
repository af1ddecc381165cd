//! Typed configuration, deserialized after validation.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;
use crate::graph::RoutingMode;
use crate::llm::OpenAiOptions;
use crate::pipeline::PipelineOptions;
use crate::rag::SplitterConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSettings,
    pub retrieval: RetrievalSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub documents_dir: PathBuf,
    pub index_path: PathBuf,
    pub routing: RoutingMode,
    pub max_question_chars: usize,
    pub graph_max_steps: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("data"),
            index_path: PathBuf::from("db/index.db"),
            routing: RoutingMode::Fixed,
            max_question_chars: 4000,
            graph_max_steps: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub document_extensions: Vec<String>,
    pub embed_batch_size: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 2,
            chunk_size: 1000,
            chunk_overlap: 100,
            document_extensions: vec!["txt".to_string()],
            embed_batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    OpenAi,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model: String,
    /// Vector size of the hashing embedder.
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAi,
            model: "text-embedding-3-small".to_string(),
            dimensions: 256,
        }
    }
}

impl AppConfig {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            routing: self.app.routing,
            top_k: self.retrieval.top_k,
            max_question_chars: self.app.max_question_chars,
            max_steps: self.app.graph_max_steps,
        }
    }

    pub fn splitter_config(&self) -> SplitterConfig {
        SplitterConfig {
            chunk_size: self.retrieval.chunk_size,
            chunk_overlap: self.retrieval.chunk_overlap,
        }
    }

    pub fn openai_options(&self) -> OpenAiOptions {
        OpenAiOptions {
            base_url: self.llm.base_url.clone(),
            api_key: self.llm.api_key.clone(),
            chat_model: self.llm.model.clone(),
            embedding_model: self.embedding.model.clone(),
            temperature: Some(self.llm.temperature),
            max_tokens: self.llm.max_tokens,
            timeout: Duration::from_secs(self.llm.timeout_secs),
        }
    }

    /// The hosted endpoint needs a key; local OpenAI-compatible servers
    /// usually do not.
    pub fn check_api_key(&self) -> Result<(), RagError> {
        let hosted = self.llm.base_url.contains("api.openai.com");
        let missing = self
            .llm
            .api_key
            .as_deref()
            .map_or(true, |key| key.trim().is_empty());
        if hosted && missing {
            return Err(RagError::config(
                "llm.api_key is not set; add it to secrets.yaml or export OPENAI_API_KEY",
            ));
        }
        Ok(())
    }
}
