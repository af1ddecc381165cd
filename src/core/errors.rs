use std::path::PathBuf;

use thiserror::Error;

use crate::graph::state::Stage;
use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("invalid question: {0}")]
    Validation(String),
    #[error("embedding index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("embedding index is empty; run ingestion before querying")]
    IndexEmpty,
    #[error("generation failed in {stage} stage: {source}")]
    Generation {
        stage: Stage,
        #[source]
        source: LlmError,
    },
    #[error("no documents found in {}", .0.display())]
    NoDocuments(PathBuf),
    #[error("pipeline state field '{0}' is already set")]
    FieldAlreadySet(&'static str),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("stage '{stage}' failed (trace: {}): {source}", .trace.join(" -> "))]
    Stage {
        stage: Stage,
        trace: Vec<String>,
        #[source]
        source: Box<RagError>,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl RagError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        RagError::Internal(err.to_string())
    }

    pub fn index_unavailable<E: std::fmt::Display>(err: E) -> Self {
        RagError::IndexUnavailable(err.to_string())
    }

    pub fn config(message: impl Into<String>) -> Self {
        RagError::Config(message.into())
    }

    /// Strips orchestrator `Stage` wrappers and returns the failure that
    /// actually aborted the run.
    pub fn root_cause(&self) -> &RagError {
        match self {
            RagError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Name of the stage that failed, when the error came out of a run.
    pub fn failed_stage(&self) -> Option<&'static str> {
        match self {
            RagError::Stage { stage, .. } => Some(stage.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_unwraps_nested_stage_errors() {
        let err = RagError::Stage {
            stage: Stage::Answer,
            trace: vec!["plan".into(), "retrieve".into(), "answer".into()],
            source: Box::new(RagError::Generation {
                stage: Stage::Answer,
                source: LlmError::EmptyResponse,
            }),
        };

        assert_eq!(err.failed_stage(), Some("answer"));
        assert!(matches!(
            err.root_cause(),
            RagError::Generation {
                stage: Stage::Answer,
                ..
            }
        ));
    }

    #[test]
    fn stage_error_message_includes_trace_and_cause() {
        let err = RagError::Stage {
            stage: Stage::Retrieve,
            trace: vec!["plan".into(), "retrieve".into()],
            source: Box::new(RagError::IndexEmpty),
        };

        let message = err.to_string();
        assert!(message.contains("plan -> retrieve"));
        assert!(message.contains("run ingestion"));
    }

    #[test]
    fn root_cause_of_plain_error_is_itself() {
        let err = RagError::Validation("question is empty".to_string());
        assert!(matches!(err.root_cause(), RagError::Validation(_)));
        assert_eq!(err.failed_stage(), None);
    }
}
