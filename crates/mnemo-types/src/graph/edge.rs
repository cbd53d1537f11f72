use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::node::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("e_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed enumeration of relationship kinds between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Uses,
    Implements,
    DependsOn,
    PartOf,
    Contains,
    CausedBy,
    SolvedBy,
    RelatedTo,
    FollowedBy,
    PrecededBy,
    MentionedIn,
    DiscussedWith,
    LearnedFrom,
    SimilarTo,
    ContrastsWith,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Uses => "uses",
            EdgeType::Implements => "implements",
            EdgeType::DependsOn => "depends_on",
            EdgeType::PartOf => "part_of",
            EdgeType::Contains => "contains",
            EdgeType::CausedBy => "caused_by",
            EdgeType::SolvedBy => "solved_by",
            EdgeType::RelatedTo => "related_to",
            EdgeType::FollowedBy => "followed_by",
            EdgeType::PrecededBy => "preceded_by",
            EdgeType::MentionedIn => "mentioned_in",
            EdgeType::DiscussedWith => "discussed_with",
            EdgeType::LearnedFrom => "learned_from",
            EdgeType::SimilarTo => "similar_to",
            EdgeType::ContrastsWith => "contrasts_with",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeMetadata {
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

pub const DEFAULT_WEIGHT: f64 = 1.0;
pub const MAX_WEIGHT: f64 = 2.0;
pub const MIN_WEIGHT: f64 = 0.1;
pub const REINFORCE_STEP: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source_id: NodeId,
    pub target_id: NodeId,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub weight: f64,
    pub bidirectional: bool,
    pub metadata: EdgeMetadata,
}

impl Edge {
    pub fn new(source_id: NodeId, target_id: NodeId, edge_type: EdgeType) -> Self {
        let now = Utc::now();
        Self {
            id: EdgeId::generate(),
            source_id,
            target_id,
            edge_type,
            weight: DEFAULT_WEIGHT,
            bidirectional: false,
            metadata: EdgeMetadata {
                created_at: Some(now),
                updated_at: Some(now),
                extra: HashMap::new(),
            },
        }
    }

    pub fn bidirectional(mut self, value: bool) -> Self {
        self.bidirectional = value;
        self
    }

    /// Bumps `weight` by 0.1, clamped to `MAX_WEIGHT`, and refreshes `updatedAt`.
    pub fn reinforce(&mut self, at: DateTime<Utc>) {
        self.weight = (self.weight + REINFORCE_STEP).min(MAX_WEIGHT);
        self.metadata.updated_at = Some(at);
    }

    /// Same (source, target, type) triple, ignoring direction metadata.
    pub fn same_triple(&self, source_id: &NodeId, target_id: &NodeId, edge_type: EdgeType) -> bool {
        &self.source_id == source_id && &self.target_id == target_id && self.edge_type == edge_type
    }
}
