use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mnemo_types::graph::{Edge, EdgeId, Node, NodeId};
use mnemo_types::session::Session;

/// A tagged id for one simulated browser tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub String);

impl TabId {
    pub fn generate() -> Self {
        Self(format!("tab_{}", uuid::Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every message a tab can broadcast, mirroring the browser `BroadcastChannel`
/// traffic this repository's `InProcessTransport` stands in for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    NodeAdded { tab_id: String, node: Node },
    NodeUpdated { tab_id: String, node: Node },
    NodeRemoved { tab_id: String, node_id: NodeId },
    EdgeAdded { tab_id: String, edge: Edge },
    EdgeRemoved { tab_id: String, edge_id: EdgeId },
    SessionStarted { tab_id: String, session: Session },
    SessionEnded { tab_id: String, session_id: String, ended_at: DateTime<Utc> },
    RequestFullSync { tab_id: String },
    FullSyncResponse {
        tab_id: String,
        target_tab_id: String,
        graph: serde_json::Value,
        stats: serde_json::Value,
    },
    Heartbeat { tab_id: String },
    LeaderClaim { tab_id: String },
    LeaderRelease { tab_id: String },
    LeaderQuery { tab_id: String },
    LeaderAnnounce { tab_id: String },
}

impl Message {
    pub fn tab_id(&self) -> &str {
        match self {
            Message::NodeAdded { tab_id, .. }
            | Message::NodeUpdated { tab_id, .. }
            | Message::NodeRemoved { tab_id, .. }
            | Message::EdgeAdded { tab_id, .. }
            | Message::EdgeRemoved { tab_id, .. }
            | Message::SessionStarted { tab_id, .. }
            | Message::SessionEnded { tab_id, .. }
            | Message::RequestFullSync { tab_id }
            | Message::FullSyncResponse { tab_id, .. }
            | Message::Heartbeat { tab_id }
            | Message::LeaderClaim { tab_id }
            | Message::LeaderRelease { tab_id }
            | Message::LeaderQuery { tab_id }
            | Message::LeaderAnnounce { tab_id } => tab_id,
        }
    }
}

pub fn node_added(tab_id: &TabId, node: Node) -> Message {
    Message::NodeAdded { tab_id: tab_id.0.clone(), node }
}

pub fn node_updated(tab_id: &TabId, node: Node) -> Message {
    Message::NodeUpdated { tab_id: tab_id.0.clone(), node }
}

pub fn node_removed(tab_id: &TabId, node_id: NodeId) -> Message {
    Message::NodeRemoved { tab_id: tab_id.0.clone(), node_id }
}

pub fn edge_added(tab_id: &TabId, edge: Edge) -> Message {
    Message::EdgeAdded { tab_id: tab_id.0.clone(), edge }
}

pub fn edge_removed(tab_id: &TabId, edge_id: EdgeId) -> Message {
    Message::EdgeRemoved { tab_id: tab_id.0.clone(), edge_id }
}
