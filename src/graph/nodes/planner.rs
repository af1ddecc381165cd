// Planner Node
// Decides whether a question needs retrieval before answering.

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::{NextStage, PipelineState};

/// Substrings marking a question as informational (matched case-insensitively).
pub const INFORMATIONAL_TRIGGERS: [&str; 6] =
    ["what", "how", "why", "benefit", "explain", "describe"];

/// `Retrieve` for informational questions, `Answer` for everything else.
pub fn classify_question(question: &str) -> NextStage {
    let lowered = question.to_lowercase();
    if INFORMATIONAL_TRIGGERS
        .iter()
        .any(|trigger| lowered.contains(trigger))
    {
        NextStage::Retrieve
    } else {
        NextStage::Answer
    }
}

pub struct PlannerNode;

impl PlannerNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlannerNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for PlannerNode {
    fn id(&self) -> &'static str {
        "plan"
    }

    fn name(&self) -> &'static str {
        "Planner"
    }

    async fn execute(
        &self,
        state: &mut PipelineState,
        _ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        let next = classify_question(state.question());
        state.route_to(next);

        tracing::debug!("Planner: routing to {}", next.as_str());
        Ok(NodeOutput::Branch(next.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_words_route_to_retrieve() {
        for question in [
            "What are the benefits of renewable energy?",
            "HOW does a heat pump work",
            "why",
            "Explain photosynthesis",
            "Please describe the process",
            "Any BENEFITS to cycling?",
        ] {
            assert_eq!(classify_question(question), NextStage::Retrieve, "{}", question);
        }
    }

    #[test]
    fn other_questions_route_to_answer() {
        for question in ["Tell me a joke", "Solar panels?", "List three fruits", "hello"] {
            assert_eq!(classify_question(question), NextStage::Answer, "{}", question);
        }
    }

    #[test]
    fn match_is_substring_based() {
        // "somewhat" contains "what"
        assert_eq!(classify_question("somewhat sunny"), NextStage::Retrieve);
        assert_eq!(classify_question("showcase"), NextStage::Retrieve);
    }
}
