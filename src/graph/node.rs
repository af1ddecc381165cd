// Node trait and types
// Base abstraction for graph nodes

use async_trait::async_trait;

use crate::core::errors::RagError;
use crate::llm::CompletionService;
use crate::rag::EmbeddingIndex;

use super::state::{PipelineState, Stage};

/// Collaborators handed to every node during execution
pub struct NodeContext<'a> {
    /// Nearest-neighbour lookup over the document collection
    pub index: &'a dyn EmbeddingIndex,
    /// Text generation
    pub completion: &'a dyn CompletionService,
    /// Number of chunks the retriever asks for
    pub top_k: usize,
}

/// Output from a node execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutput {
    /// Continue to the specified next node (None = use default edge)
    Continue(Option<String>),
    /// Branch to one of the specified nodes based on condition
    Branch(String),
    /// Graph execution complete
    Final,
}

/// Graph execution error
///
/// `execution_trace` records the node IDs visited up to and including the
/// failing one, oldest first.
#[derive(Debug)]
pub struct GraphError {
    pub node_id: String,
    pub error: RagError,
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, error: RagError) -> Self {
        Self {
            node_id: node_id.into(),
            error,
            execution_trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }
}

/// Failures inside a stage keep their cause; runtime failures (step limit,
/// missing edges) become `Internal`.
impl From<GraphError> for RagError {
    fn from(err: GraphError) -> Self {
        match Stage::from_node_id(&err.node_id) {
            Some(stage) => RagError::Stage {
                stage,
                trace: err.execution_trace,
                source: Box::new(err.error),
            },
            None => RagError::Internal(err.to_string()),
        }
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "GraphError in {}: {}", self.node_id, self.error)
        } else {
            write!(
                f,
                "GraphError in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.error
            )
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    /// Execute the node logic
    async fn execute(
        &self,
        state: &mut PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_converts_into_stage_error() {
        let err = GraphError::new("retrieve", RagError::IndexEmpty)
            .with_trace(vec!["plan".to_string(), "retrieve".to_string()]);
        assert_eq!(
            err.to_string(),
            "GraphError in retrieve (trace: plan -> retrieve): embedding index is empty; run ingestion before querying"
        );

        let rag: RagError = err.into();
        assert_eq!(rag.failed_stage(), Some("retrieve"));
        assert!(matches!(
            rag,
            RagError::Stage {
                stage: Stage::Retrieve,
                ..
            }
        ));
        assert!(matches!(rag.root_cause(), RagError::IndexEmpty));
    }

    #[test]
    fn runtime_failure_converts_into_internal_error() {
        let err = GraphError::new(
            "runtime",
            RagError::Internal("Maximum steps (4) exceeded".into()),
        )
        .with_trace(vec!["plan".to_string()]);

        let rag: RagError = err.into();
        assert_eq!(rag.failed_stage(), None);
        assert!(matches!(rag, RagError::Internal(msg) if msg.contains("Maximum steps")));
    }
}
