// Reflector Node
// Asks the model for a short verdict on the generated answer. Terminal node.

use async_trait::async_trait;

use crate::core::errors::RagError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::prompts::reflection_prompt;
use crate::graph::state::{PipelineState, Stage};
use crate::llm::LlmError;

pub struct ReflectorNode;

impl ReflectorNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReflectorNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for ReflectorNode {
    fn id(&self) -> &'static str {
        "reflect"
    }

    fn name(&self) -> &'static str {
        "Reflector"
    }

    async fn execute(
        &self,
        state: &mut PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let answer = state.answer().ok_or_else(|| {
            GraphError::new(
                self.id(),
                RagError::Internal("reflect stage reached without an answer".to_string()),
            )
        })?;
        let prompt = reflection_prompt(state.question(), answer);

        let generation_error = |source: LlmError| {
            GraphError::new(
                self.id(),
                RagError::Generation {
                    stage: Stage::Reflect,
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

        tracing::debug!("Reflector: {}", completion.text.trim());
        state
            .set_reflection(completion.text)
            .map_err(|err| GraphError::new(self.id(), err))?;

        Ok(NodeOutput::Final)
    }
}
