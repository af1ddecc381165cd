use async_trait::async_trait;
use thiserror::Error;

use super::types::Completion;

/// Failures reported by a text-completion or embedding provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider refused the request (bad prompt, auth, quota, size).
    #[error("request rejected by provider (status {status}): {message}")]
    Rejected { status: u16, message: String },
    /// Transport failure, timeout, or a server-side error.
    #[error("provider unreachable: {0}")]
    Unreachable(String),
    #[error("provider returned an empty response")]
    EmptyResponse,
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl LlmError {
    pub fn unreachable<E: std::fmt::Display>(err: E) -> Self {
        LlmError::Unreachable(err.to_string())
    }

    pub fn malformed<E: std::fmt::Display>(err: E) -> Self {
        LlmError::Malformed(err.to_string())
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// single-prompt completion; resolves only once the full text is available
    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError>;
}
