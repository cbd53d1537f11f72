pub mod edge;
pub mod node;

pub use edge::{
    Edge, EdgeId, EdgeMetadata, EdgeType, DEFAULT_WEIGHT, MAX_WEIGHT, MIN_WEIGHT, REINFORCE_STEP,
};
pub use node::{
    stable_stringify, Node, NodeContent, NodeId, NodeMetadata, NodeType, DEFAULT_CONFIDENCE,
    DEFAULT_DECAY, DEFAULT_IMPORTANCE, MIN_DECAY,
};
