use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single turn in a captured conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub text: String,
}

/// A full conversation record, as held by the conversation store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub url: String,
    pub ts: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub text: String,
    pub hash: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An incoming save payload. Fields left `None`/absent are not overridden
/// during the merge described in SPEC_FULL §4.6.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationInput {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub hash: Option<String>,
    pub tags: Option<Vec<String>>,
    pub pinned: Option<bool>,
    pub notes: Option<String>,
}

/// Patch applied by `update_conversation_meta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationMetaPatch {
    pub tags: Option<Vec<String>>,
    pub pinned: Option<bool>,
    pub notes: Option<String>,
}

/// The full persisted document: `{byId, order, urlToId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationDocument {
    pub by_id: HashMap<String, Conversation>,
    pub order: Vec<String>,
    pub url_to_id: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    pub pinned_only: bool,
    pub has_code: bool,
    pub tag: Option<String>,
    pub tags: Vec<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSort {
    Relevance,
    Recency,
}

impl Default for SearchSort {
    fn default() -> Self {
        SearchSort::Relevance
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub limit: Option<usize>,
    pub filters: SearchFilters,
    pub sort: SearchSort,
}
