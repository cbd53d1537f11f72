use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::graph::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(format!("s_{}", uuid::Uuid::new_v4().simple()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionCounters {
    pub prompt_count: u32,
    pub response_count: u32,
    pub code_block_count: u32,
    pub error_count: u32,
}

/// A temporal bundle of nodes co-created while one chat is active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub platform: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub node_ids: HashSet<NodeId>,
    pub counters: SessionCounters,
    pub primary_language: Option<String>,
    pub primary_framework: Option<String>,
    pub primary_topic: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SessionMeta {
    pub platform: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl Session {
    pub fn start(meta: SessionMeta, started_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::generate(),
            started_at,
            ended_at: None,
            platform: meta.platform,
            url: meta.url,
            title: meta.title,
            description: meta.description,
            tags: meta.tags,
            node_ids: HashSet::new(),
            counters: SessionCounters::default(),
            primary_language: None,
            primary_framework: None,
            primary_topic: None,
            is_active: true,
        }
    }

    pub fn end(&mut self, ended_at: DateTime<Utc>) {
        self.ended_at = Some(ended_at);
        self.is_active = false;
    }
}
