//! Shared domain types for the Mnemo memory core.
//!
//! This crate has no behavior of its own beyond small invariant-preserving
//! constructors and helpers; the graph, extractor, stores and dispatcher all
//! build on these shapes. Kept dependency-light (serde + chrono + uuid only)
//! so every other crate in the workspace can depend on it without pulling in
//! storage or networking stacks.

pub mod connector;
pub mod conversation;
pub mod error;
pub mod graph;
pub mod job;
pub mod router;
pub mod session;
pub mod settings;

pub use connector::{Connector, ConnectorDocument};
pub use conversation::{
    Conversation, ConversationDocument, ConversationInput, ConversationMetaPatch, Message,
    SearchFilters, SearchQuery, SearchSort,
};
pub use error::{Error, Result};
pub use graph::{
    Edge, EdgeId, EdgeMetadata, EdgeType, Node, NodeContent, NodeId, NodeMetadata, NodeType,
};
pub use job::{Job, JobDocument, JobStatus};
pub use router::{RouterError, RouterResult};
pub use session::{Session, SessionCounters, SessionId, SessionMeta};
pub use settings::{ScriptRegistryEntry, Settings, UiSettings};
