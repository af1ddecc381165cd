// Retriever Node
// Attaches the nearest document chunks as context.

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{NextStage, PipelineState};
use crate::rag::ScoredChunk;

/// Chunk texts joined by a single newline, in the order given.
pub fn join_chunks(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|scored| scored.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct RetrieverNode;

impl RetrieverNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RetrieverNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RetrieverNode {
    fn id(&self) -> &'static str {
        "retrieve"
    }

    fn name(&self) -> &'static str {
        "Retriever"
    }

    async fn execute(
        &self,
        state: &mut PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let mut results = ctx
            .index
            .query(state.question(), ctx.top_k)
            .await
            .map_err(|err| GraphError::new(self.id(), err))?;
        results.truncate(ctx.top_k);

        tracing::debug!(
            "Retriever: {} chunks from [{}]",
            results.len(),
            results
                .iter()
                .map(|r| r.chunk.source_id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        state
            .set_context(join_chunks(&results))
            .map_err(|err| GraphError::new(self.id(), err))?;
        state.route_to(NextStage::Answer);

        Ok(NodeOutput::Continue(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::DocumentChunk;

    fn scored(text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: DocumentChunk::new(text, "doc.txt", 0, 0),
            score,
        }
    }

    #[test]
    fn join_preserves_order_with_single_newline() {
        let chunks = vec![scored("best", 0.9), scored("second", 0.5)];
        assert_eq!(join_chunks(&chunks), "best\nsecond");
    }

    #[test]
    fn join_of_nothing_is_empty_string() {
        assert_eq!(join_chunks(&[]), "");
    }
}
