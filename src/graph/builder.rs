// Graph Builder
// Constructs the plan → retrieve → answer → reflect graph using petgraph

use serde::{Deserialize, Serialize};

use super::node::GraphError;
use super::nodes::{AnswererNode, PlannerNode, ReflectorNode, RetrieverNode};
use super::runtime::{GraphBuilder, GraphRuntime};

/// How the planner's routing hint is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Every run goes plan → retrieve → answer → reflect; the hint is
    /// recorded but both of its values lead to the retriever.
    #[default]
    Fixed,
    /// A planner decision of `answer` skips retrieval.
    Planner,
}

impl RoutingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingMode::Fixed => "fixed",
            RoutingMode::Planner => "planner",
        }
    }
}

/// Build the pipeline graph
pub fn build_rag_graph(routing: RoutingMode, max_steps: usize) -> Result<GraphRuntime, GraphError> {
    let builder = GraphBuilder::new()
        .entry("plan")
        .max_steps(max_steps)
        .node(Box::new(PlannerNode::new()))
        .node(Box::new(RetrieverNode::new()))
        .node(Box::new(AnswererNode::new()))
        .node(Box::new(ReflectorNode::new()))
        // Planner edges
        .conditional_edge("plan", "retrieve", "retrieve");

    let builder = match routing {
        RoutingMode::Fixed => builder.conditional_edge("plan", "retrieve", "answer"),
        RoutingMode::Planner => builder.conditional_edge("plan", "answer", "answer"),
    };

    builder
        .edge("retrieve", "answer")
        .edge("answer", "reflect")
        .build()
}
