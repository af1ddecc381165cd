// Graph Module
// StateGraph architecture for the plan/retrieve/answer/reflect pipeline

pub mod builder;
pub mod node;
pub mod prompts;
pub mod runtime;
pub mod state;

pub mod nodes;

pub use builder::{build_rag_graph, RoutingMode};
pub use node::{GraphError, Node, NodeContext, NodeOutput};
pub use runtime::GraphRuntime;
pub use state::{NextStage, PipelineState, RunOutput, Stage};
