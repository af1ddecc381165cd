// Graph Runtime - petgraph based
// Type-safe StateGraph execution engine

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::PipelineState;
use crate::core::errors::RagError;

/// Edge condition for graph routing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeCondition {
    /// Always follow this edge (default edge)
    Always,
    /// Follow this edge when the node returns this condition
    OnCondition(String),
}

impl EdgeCondition {
    pub fn on(condition: impl Into<String>) -> Self {
        Self::OnCondition(condition.into())
    }

    pub fn matches(&self, condition: Option<&str>) -> bool {
        match (self, condition) {
            (EdgeCondition::Always, None) => true,
            (EdgeCondition::OnCondition(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

fn runtime_error(message: impl Into<String>) -> GraphError {
    GraphError::new("runtime", RagError::Internal(message.into()))
}

/// petgraph-based StateGraph runtime
pub struct GraphRuntime {
    /// The underlying directed graph
    graph: DiGraph<Box<dyn Node>, EdgeCondition>,
    /// Map from node ID to NodeIndex for lookup
    node_indices: HashMap<String, NodeIndex>,
    /// Entry point node ID
    entry_node_id: String,
    /// Maximum execution steps (recursion limit)
    max_steps: usize,
}

impl GraphRuntime {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 16,
        }
    }

    pub fn add_node(&mut self, node: Box<dyn Node>) -> NodeIndex {
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        index
    }

    /// Add an edge between two nodes (always follow)
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        self.add_conditional_edge(from, to, EdgeCondition::Always)
    }

    pub fn add_conditional_edge(
        &mut self,
        from: &str,
        to: &str,
        condition: EdgeCondition,
    ) -> Result<(), GraphError> {
        let from_idx = self
            .node_indices
            .get(from)
            .ok_or_else(|| runtime_error(format!("Source node not found: {}", from)))?;
        let to_idx = self
            .node_indices
            .get(to)
            .ok_or_else(|| runtime_error(format!("Target node not found: {}", to)))?;

        self.graph.add_edge(*from_idx, *to_idx, condition);
        Ok(())
    }

    pub fn entry_node_id(&self) -> &str {
        &self.entry_node_id
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> Vec<&str> {
        self.node_indices.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Execute the graph from the entry node until a node returns `Final`.
    ///
    /// Returns the IDs of the nodes executed, in order. On failure the
    /// error carries the same trace up to and including the failing node.
    pub async fn run(
        &self,
        state: &mut PipelineState,
        ctx: &NodeContext<'_>,
    ) -> Result<Vec<String>, GraphError> {
        let mut current_idx = *self.node_indices.get(&self.entry_node_id).ok_or_else(|| {
            runtime_error(format!("Entry node not found: {}", self.entry_node_id))
        })?;

        let mut trace: Vec<String> = Vec::new();

        loop {
            if trace.len() >= self.max_steps {
                return Err(runtime_error(format!(
                    "Maximum steps ({}) exceeded",
                    self.max_steps
                ))
                .with_trace(trace));
            }

            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| runtime_error("Node not found in graph"))?;

            let node_id = node.id();
            trace.push(node_id.to_string());
            tracing::debug!("Executing node: {} (step {})", node.name(), trace.len());

            let output = match node.execute(state, ctx).await {
                Ok(output) => output,
                Err(err) => return Err(err.with_trace(trace)),
            };

            let next = match output {
                NodeOutput::Final => {
                    tracing::debug!("Graph execution complete at node: {}", node_id);
                    return Ok(trace);
                }
                NodeOutput::Continue(explicit_next) => {
                    self.resolve_next_node(current_idx, None, explicit_next.as_deref())
                }
                NodeOutput::Branch(condition) => {
                    self.resolve_next_node(current_idx, Some(&condition), None)
                }
            };

            current_idx = match next {
                Ok(idx) => idx,
                Err(err) => return Err(err.with_trace(trace)),
            };
        }
    }

    fn resolve_next_node(
        &self,
        current_idx: NodeIndex,
        condition: Option<&str>,
        explicit: Option<&str>,
    ) -> Result<NodeIndex, GraphError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        if let Some(next_id) = explicit {
            return self.node_indices.get(next_id).copied().ok_or_else(|| {
                GraphError::new(
                    current_id,
                    RagError::Internal(format!("Explicit target node not found: {}", next_id)),
                )
            });
        }

        let edges: Vec<(NodeIndex, &EdgeCondition)> = self
            .graph
            .edges_directed(current_idx, Direction::Outgoing)
            .map(|edge_ref| (edge_ref.target(), edge_ref.weight()))
            .collect();

        if edges.is_empty() {
            return Err(GraphError::new(
                current_id,
                RagError::Internal(format!("No outgoing edges from node: {}", current_id)),
            ));
        }

        if let Some((target_idx, _)) = edges.iter().find(|(_, weight)| weight.matches(condition)) {
            return Ok(*target_idx);
        }

        // Unmatched condition falls back to the default edge
        if let Some((target_idx, _)) = edges
            .iter()
            .find(|(_, weight)| **weight == EdgeCondition::Always)
        {
            tracing::warn!(
                "Condition '{}' not matched for node '{}', using default edge",
                condition.unwrap_or(""),
                current_id
            );
            return Ok(*target_idx);
        }

        Err(GraphError::new(
            current_id,
            RagError::Internal(format!(
                "No matching edge for condition: {}",
                condition.unwrap_or("(none)")
            )),
        ))
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(String, String, EdgeCondition)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::Always));
        self
    }

    pub fn conditional_edge(
        mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        self.pending_edges
            .push((from.into(), to.into(), EdgeCondition::on(condition)));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        if !self
            .runtime
            .node_indices
            .contains_key(&self.runtime.entry_node_id)
        {
            return Err(runtime_error(format!(
                "Entry node not found: {}",
                self.runtime.entry_node_id
            )));
        }

        for (from, to, condition) in self.pending_edges {
            self.runtime.add_conditional_edge(&from, &to, condition)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
