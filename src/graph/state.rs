// Graph State
// PipelineState and the stage vocabulary of the plan/retrieve/answer/reflect graph

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::RagError;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Plan,
    Retrieve,
    Answer,
    Reflect,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Plan => "plan",
            Stage::Retrieve => "retrieve",
            Stage::Answer => "answer",
            Stage::Reflect => "reflect",
        }
    }

    /// Stage run by the graph node with this id.
    pub fn from_node_id(node_id: &str) -> Option<Stage> {
        match node_id {
            "plan" => Some(Stage::Plan),
            "retrieve" => Some(Stage::Retrieve),
            "answer" => Some(Stage::Answer),
            "reflect" => Some(Stage::Reflect),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing hint written by a stage for the one after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextStage {
    Retrieve,
    Answer,
    Reflect,
}

impl NextStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            NextStage::Retrieve => "retrieve",
            NextStage::Answer => "answer",
            NextStage::Reflect => "reflect",
        }
    }
}

/// State threaded through one pipeline run.
///
/// `context`, `answer` and `reflection` are write-once: each belongs to a
/// single stage and a second write is rejected. `next_stage` is transient
/// and may be rewritten by every stage.
#[derive(Debug, Clone)]
pub struct PipelineState {
    question: String,
    context: Option<String>,
    answer: Option<String>,
    reflection: Option<String>,
    next_stage: Option<NextStage>,
}

impl PipelineState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: None,
            answer: None,
            reflection: None,
            next_stage: None,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn reflection(&self) -> Option<&str> {
        self.reflection.as_deref()
    }

    pub fn next_stage(&self) -> Option<NextStage> {
        self.next_stage
    }

    pub fn set_context(&mut self, context: String) -> Result<(), RagError> {
        set_once(&mut self.context, context, "context")
    }

    pub fn set_answer(&mut self, answer: String) -> Result<(), RagError> {
        set_once(&mut self.answer, answer, "answer")
    }

    pub fn set_reflection(&mut self, reflection: String) -> Result<(), RagError> {
        set_once(&mut self.reflection, reflection, "reflection")
    }

    pub fn route_to(&mut self, next: NextStage) {
        self.next_stage = Some(next);
    }

    /// Caller-visible result; fails if the run stopped before reflecting.
    pub fn into_output(self) -> Result<RunOutput, RagError> {
        let answer = self
            .answer
            .ok_or_else(|| RagError::Internal("pipeline finished without an answer".to_string()))?;
        let reflection = self.reflection.ok_or_else(|| {
            RagError::Internal("pipeline finished without a reflection".to_string())
        })?;

        Ok(RunOutput {
            question: self.question,
            context: self.context,
            answer,
            reflection,
        })
    }
}

fn set_once(slot: &mut Option<String>, value: String, field: &'static str) -> Result<(), RagError> {
    if slot.is_some() {
        return Err(RagError::FieldAlreadySet(field));
    }
    *slot = Some(value);
    Ok(())
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub answer: String,
    pub reflection: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_only_the_question() {
        let state = PipelineState::new("Why is the sky blue?");
        assert_eq!(state.question(), "Why is the sky blue?");
        assert!(state.context().is_none());
        assert!(state.answer().is_none());
        assert!(state.reflection().is_none());
        assert!(state.next_stage().is_none());
    }

    #[test]
    fn output_fields_are_write_once() {
        let mut state = PipelineState::new("q");
        state.set_context(String::new()).unwrap();
        state.set_answer("first".to_string()).unwrap();
        state.set_reflection("ok".to_string()).unwrap();

        assert!(matches!(
            state.set_context("again".to_string()),
            Err(RagError::FieldAlreadySet("context"))
        ));
        assert!(matches!(
            state.set_answer("second".to_string()),
            Err(RagError::FieldAlreadySet("answer"))
        ));
        assert!(matches!(
            state.set_reflection("again".to_string()),
            Err(RagError::FieldAlreadySet("reflection"))
        ));
        assert_eq!(state.context(), Some(""));
        assert_eq!(state.answer(), Some("first"));
    }

    #[test]
    fn routing_hint_can_be_rewritten() {
        let mut state = PipelineState::new("q");
        state.route_to(NextStage::Retrieve);
        state.route_to(NextStage::Answer);
        assert_eq!(state.next_stage(), Some(NextStage::Answer));
    }

    #[test]
    fn output_requires_answer_and_reflection() {
        let mut state = PipelineState::new("q");
        state.set_answer("a".to_string()).unwrap();
        assert!(state.clone().into_output().is_err());

        state.set_reflection("r".to_string()).unwrap();
        let output = state.into_output().unwrap();
        assert_eq!(output.answer, "a");
        assert_eq!(output.reflection, "r");
        assert_eq!(output.context, None);
    }

    #[test]
    fn output_json_never_carries_routing() {
        let mut state = PipelineState::new("What is wind power?");
        state.route_to(NextStage::Reflect);
        state.set_context("wind turbines".to_string()).unwrap();
        state.set_answer("Energy from wind.".to_string()).unwrap();
        state.set_reflection("Yes, relevant and complete".to_string()).unwrap();

        let json = serde_json::to_value(state.into_output().unwrap()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 4);
        assert!(!keys.contains(&"next_stage"));
        assert_eq!(json["context"], "wind turbines");
    }

    #[test]
    fn stage_names() {
        for stage in [Stage::Plan, Stage::Retrieve, Stage::Answer, Stage::Reflect] {
            assert_eq!(Stage::from_node_id(stage.as_str()), Some(stage));
        }
        assert_eq!(Stage::from_node_id("runtime"), None);
        assert_eq!(Stage::Plan.to_string(), "plan");
        assert_eq!(Stage::Reflect.as_str(), "reflect");
        assert_eq!(NextStage::Answer.as_str(), "answer");
    }
}
