//! `ragloop`: a four-stage retrieval-augmented question answering pipeline.
//!
//! A question flows plan → retrieve → answer → reflect over a small
//! state-graph runtime. Retrieval is backed by an embedding index over a
//! local document collection; generation goes through an OpenAI-compatible
//! completion service.

pub mod core;
pub mod graph;
pub mod llm;
pub mod pipeline;
pub mod rag;
pub mod vector_math;

pub use crate::core::config::{AppConfig, AppPaths, ConfigService};
pub use crate::core::errors::RagError;
pub use crate::graph::{RoutingMode, RunOutput};
pub use crate::pipeline::{PipelineOptions, RagPipeline};
