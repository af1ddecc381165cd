pub mod openai;
pub mod provider;
pub mod types;

pub use openai::{OpenAiClient, OpenAiOptions};
pub use provider::{CompletionService, LlmError};
pub use types::{ChatMessage, ChatRequest, Completion};
