use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable opaque identifier for a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("n_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed enumeration of node kinds the graph can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Language,
    Framework,
    Library,
    CodeBlock,
    Function,
    Class,
    File,
    Error,
    Bug,
    Issue,
    Project,
    Task,
    Goal,
    Feature,
    Topic,
    Concept,
    Technology,
    Url,
    Documentation,
    Api,
    Conversation,
    Prompt,
    Response,
}

impl NodeType {
    pub const ALL: &'static [NodeType] = &[
        NodeType::Language,
        NodeType::Framework,
        NodeType::Library,
        NodeType::CodeBlock,
        NodeType::Function,
        NodeType::Class,
        NodeType::File,
        NodeType::Error,
        NodeType::Bug,
        NodeType::Issue,
        NodeType::Project,
        NodeType::Task,
        NodeType::Goal,
        NodeType::Feature,
        NodeType::Topic,
        NodeType::Concept,
        NodeType::Technology,
        NodeType::Url,
        NodeType::Documentation,
        NodeType::Api,
        NodeType::Conversation,
        NodeType::Prompt,
        NodeType::Response,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Language => "language",
            NodeType::Framework => "framework",
            NodeType::Library => "library",
            NodeType::CodeBlock => "code_block",
            NodeType::Function => "function",
            NodeType::Class => "class",
            NodeType::File => "file",
            NodeType::Error => "error",
            NodeType::Bug => "bug",
            NodeType::Issue => "issue",
            NodeType::Project => "project",
            NodeType::Task => "task",
            NodeType::Goal => "goal",
            NodeType::Feature => "feature",
            NodeType::Topic => "topic",
            NodeType::Concept => "concept",
            NodeType::Technology => "technology",
            NodeType::Url => "url",
            NodeType::Documentation => "documentation",
            NodeType::Api => "api",
            NodeType::Conversation => "conversation",
            NodeType::Prompt => "prompt",
            NodeType::Response => "response",
        }
    }
}

/// Free-form content a node carries. Most nodes hold plain text; a few
/// (e.g. code blocks) carry small structured values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeContent {
    Text(String),
    Structured(serde_json::Value),
}

impl NodeContent {
    /// A stable textual view used for hashing and substring search, regardless
    /// of whether the content is plain text or a structured value.
    pub fn stable_string(&self) -> String {
        match self {
            NodeContent::Text(s) => s.clone(),
            NodeContent::Structured(v) => stable_stringify(v),
        }
    }
}

/// Deterministic JSON stringification: object keys sorted, no whitespace.
/// Used so that two structurally-identical values always hash the same way.
pub fn stable_stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{:?}:{}", k, stable_stringify(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(stable_stringify).collect();
            format!("[{}]", parts.join(","))
        }
        other => other.to_string(),
    }
}

impl From<&str> for NodeContent {
    fn from(s: &str) -> Self {
        NodeContent::Text(s.to_string())
    }
}

impl From<String> for NodeContent {
    fn from(s: String) -> Self {
        NodeContent::Text(s)
    }
}

/// Free-form plus well-known metadata carried on a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub access_count: u32,
    pub last_accessed_at: Option<DateTime<Utc>>,

    /// Free-form keys such as `language`, `context`, `errorType`.
    #[serde(default, flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl NodeMetadata {
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.extra.insert(key.into(), v);
        }
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }
}

/// A typed node in the memory graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub content: NodeContent,
    pub metadata: NodeMetadata,
    pub importance: f64,
    pub confidence: f64,
    pub decay: f64,
    pub source: Option<String>,
    pub platform: Option<String>,
    pub session_id: Option<String>,

    /// Reserved slot for a future embedding vector. Never populated by this
    /// crate; carried only so a downstream consumer can attach one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

pub const DEFAULT_IMPORTANCE: f64 = 0.5;
pub const DEFAULT_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_DECAY: f64 = 1.0;
pub const MIN_DECAY: f64 = 0.1;

impl Node {
    pub fn new(node_type: NodeType, content: impl Into<NodeContent>) -> Self {
        let now = Utc::now();
        Self {
            id: NodeId::generate(),
            node_type,
            content: content.into(),
            metadata: NodeMetadata {
                created_at: Some(now),
                updated_at: Some(now),
                access_count: 0,
                last_accessed_at: None,
                extra: HashMap::new(),
            },
            importance: DEFAULT_IMPORTANCE,
            confidence: DEFAULT_CONFIDENCE,
            decay: DEFAULT_DECAY,
            source: None,
            platform: None,
            session_id: None,
            embedding: None,
        }
    }

    /// Record an access: bumps `accessCount`, refreshes `lastAccessedAt`, and
    /// boosts `decay` by 0.1 clamped to 1.0, per the decay invariant.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.metadata.access_count += 1;
        self.metadata.last_accessed_at = Some(at);
        self.decay = (self.decay + 0.1).min(1.0);
    }

    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let created = self.metadata.created_at.unwrap_or(now);
        (now - created).num_milliseconds().max(0) as f64 / 3_600_000.0
    }

    pub fn hours_since_last_access(&self, now: DateTime<Utc>) -> Option<f64> {
        self.metadata
            .last_accessed_at
            .map(|t| (now - t).num_milliseconds().max(0) as f64 / 3_600_000.0)
    }

    /// The composite relevance score (§4.1), clamped to [0, 1].
    pub fn relevance_score(&self, now: DateTime<Utc>) -> f64 {
        let age_hours = self.age_hours(now);
        let time_decay = 0.5f64.powf(age_hours / 24.0);

        let recency_boost = match self.hours_since_last_access(now) {
            Some(h) => (-h / 4.0).exp() * 0.3,
            None => 0.0,
        };

        let access_boost = (1.0 + self.metadata.access_count as f64).ln() * 0.1;

        let composite = 0.30 * self.importance
            + 0.20 * self.confidence
            + 0.25 * time_decay
            + 0.15 * recency_boost
            + 0.10 * access_boost;

        (composite * self.decay).clamp(0.0, 1.0)
    }
}
