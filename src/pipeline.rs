//! Pipeline entry point.
//!
//! `RagPipeline` owns the compiled graph and the injected collaborators;
//! `run` validates the question, executes plan → retrieve → answer →
//! reflect on a fresh state, and returns the caller-visible result.

use std::sync::Arc;

use tracing::Instrument;

use crate::core::errors::RagError;
use crate::graph::{build_rag_graph, GraphRuntime, NodeContext, PipelineState, RoutingMode, RunOutput};
use crate::llm::CompletionService;
use crate::rag::EmbeddingIndex;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub routing: RoutingMode,
    pub top_k: usize,
    pub max_question_chars: usize,
    pub max_steps: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            routing: RoutingMode::Fixed,
            top_k: 2,
            max_question_chars: 4000,
            max_steps: 16,
        }
    }
}

pub struct RagPipeline {
    graph: GraphRuntime,
    index: Arc<dyn EmbeddingIndex>,
    completion: Arc<dyn CompletionService>,
    options: PipelineOptions,
}

impl RagPipeline {
    pub fn new(
        index: Arc<dyn EmbeddingIndex>,
        completion: Arc<dyn CompletionService>,
        options: PipelineOptions,
    ) -> Result<Self, RagError> {
        if options.top_k == 0 {
            return Err(RagError::config("retrieval.top_k must be at least 1"));
        }

        let graph = build_rag_graph(options.routing, options.max_steps)?;
        tracing::debug!(
            "Pipeline graph built (routing: {}, top_k: {})",
            options.routing.as_str(),
            options.top_k
        );

        Ok(Self {
            graph,
            index,
            completion,
            options,
        })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Rejects blank or oversized questions before any stage runs.
    pub fn validate_question(&self, question: &str) -> Result<(), RagError> {
        if question.trim().is_empty() {
            return Err(RagError::Validation("question must not be empty".to_string()));
        }
        let chars = question.chars().count();
        if chars > self.options.max_question_chars {
            return Err(RagError::Validation(format!(
                "question is {} characters long; the limit is {}",
                chars, self.options.max_question_chars
            )));
        }
        Ok(())
    }

    pub async fn run(&self, question: &str) -> Result<RunOutput, RagError> {
        self.validate_question(question)?;

        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("pipeline_run", %run_id);

        async {
            let mut state = PipelineState::new(question);
            let ctx = NodeContext {
                index: self.index.as_ref(),
                completion: self.completion.as_ref(),
                top_k: self.options.top_k,
            };

            let trace = match self.graph.run(&mut state, &ctx).await {
                Ok(trace) => trace,
                Err(err) => {
                    tracing::warn!("Pipeline run failed: {}", err);
                    return Err(err.into());
                }
            };

            tracing::info!("Pipeline run complete ({})", trace.join(" -> "));
            state.into_output()
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{HashingEmbedder, MemoryRagStore, VectorIndex};
    use crate::llm::{Completion, LlmError};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl CompletionService for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
            Ok(Completion::new(format!("{} chars", prompt.len())))
        }
    }

    fn pipeline(options: PipelineOptions) -> Result<RagPipeline, RagError> {
        let index = VectorIndex::new(
            Arc::new(HashingEmbedder::default()),
            Arc::new(MemoryRagStore::new()),
        );
        RagPipeline::new(Arc::new(index), Arc::new(Echo), options)
    }

    #[test]
    fn zero_top_k_is_a_config_error() {
        let result = pipeline(PipelineOptions {
            top_k: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn validation_rejects_blank_and_oversized_questions() {
        let pipeline = pipeline(PipelineOptions {
            max_question_chars: 10,
            ..Default::default()
        })
        .unwrap();

        assert!(matches!(
            pipeline.validate_question("   \n"),
            Err(RagError::Validation(_))
        ));
        assert!(matches!(
            pipeline.validate_question("this is far too long"),
            Err(RagError::Validation(_))
        ));
        assert!(pipeline.validate_question("short?").is_ok());
    }

    #[tokio::test]
    async fn unbuilt_index_fails_in_retrieve_stage() {
        let pipeline = pipeline(PipelineOptions::default()).unwrap();
        let err = pipeline.run("What is wind power?").await.unwrap_err();

        assert_eq!(err.failed_stage(), Some("retrieve"));
        assert!(matches!(err.root_cause(), RagError::IndexEmpty));
    }
}
