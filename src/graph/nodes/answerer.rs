// Answerer Node
// Generates the answer from question and retrieved context.

use async_trait::async_trait;

use crate::core::errors::RagError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::prompts::answer_prompt;
use crate::graph::state::{NextStage, PipelineState, Stage};
use crate::llm::LlmError;

pub struct AnswererNode;

impl AnswererNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnswererNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for AnswererNode {
    fn id(&self) -> &'static str {
        "answer"
    }

    fn name(&self) -> &'static str {
        "Answerer"
    }

    async fn execute(
        &self,
        state: &mut PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let prompt = answer_prompt(state.question(), state.context().unwrap_or(""));

        let generation_error = |source: LlmError| {
            GraphError::new(
                self.id(),
                RagError::Generation {
                    stage: Stage::Answer,
                    source,
                },
            )
        };

        let completion = ctx
            .completion
            .complete(&prompt)
            .await
            .map_err(generation_error)?;
        if completion.is_blank() {
            return Err(generation_error(LlmError::EmptyResponse));
        }

        tracing::debug!("Answerer: {} chars generated", completion.text.len());
        state
            .set_answer(completion.text)
            .map_err(|err| GraphError::new(self.id(), err))?;
        state.route_to(NextStage::Reflect);

        Ok(NodeOutput::Continue(None))
    }
}
