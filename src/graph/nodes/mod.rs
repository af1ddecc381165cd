// Graph Nodes Module
// One node per pipeline stage

pub mod answerer;
pub mod planner;
pub mod reflector;
pub mod retriever;

pub use answerer::AnswererNode;
pub use planner::PlannerNode;
pub use reflector::ReflectorNode;
pub use retriever::RetrieverNode;
