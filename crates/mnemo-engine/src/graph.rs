//! The in-memory, authoritative memory graph. Every mutation here is local
//! and synchronous — persistence (`mnemo-index`) and cross-tab broadcast
//! (`mnemo-sync`) are layered on top by callers, never invoked from here.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mnemo_types::graph::{
    stable_stringify, Edge, EdgeId, EdgeType, Node, NodeContent, NodeId, NodeMetadata, NodeType,
};
use mnemo_types::session::{Session, SessionId, SessionMeta};

const DEFAULT_PRUNE_MIN_RELEVANCE: f64 = 0.05;
const DEFAULT_PRUNE_MIN_AGE_HOURS: f64 = 7.0 * 24.0;
const DEFAULT_DECAY_AMOUNT: f64 = 0.01;

/// Parameters for `add_node`; mirrors the optional override fields the
/// spec's `addNode(type, content, metadata)` accepts.
#[derive(Debug, Clone, Default)]
pub struct NewNode {
    pub importance: Option<f64>,
    pub confidence: Option<f64>,
    pub source: Option<String>,
    pub platform: Option<String>,
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySort {
    Relevance,
    Created,
    Accessed,
}

impl Default for QuerySort {
    fn default() -> Self {
        QuerySort::Relevance
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeQuery {
    pub types: Option<HashSet<NodeType>>,
    pub platform: Option<String>,
    pub session_id: Option<String>,
    pub content_contains: Option<String>,
    pub min_relevance: Option<f64>,
    pub within_hours: Option<f64>,
    pub sort: QuerySort,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    sessions: Vec<Session>,
    active_session: Option<SessionId>,
}

#[derive(Default)]
pub struct MemoryGraph {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeId, Edge>,
    sessions: HashMap<SessionId, Session>,
    active_session: Option<SessionId>,

    nodes_by_type: HashMap<NodeType, HashSet<NodeId>>,
    content_hash_to_node: HashMap<String, NodeId>,
    content_hash_by_node: HashMap<NodeId, String>,
    /// Every edge touching a node, regardless of which side it's on.
    adjacency: HashMap<NodeId, HashSet<EdgeId>>,
    edges_by_type: HashMap<EdgeType, HashSet<EdgeId>>,

    /// Timestamp of the most recent mutation, as reported by the caller.
    /// Used by `mnemo-sync` to decide whether an incoming full-sync snapshot
    /// is newer than the local graph.
    last_modified: Option<DateTime<Utc>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn active_session(&self) -> Option<&Session> {
        self.active_session.as_ref().and_then(|id| self.sessions.get(id))
    }

    /// Computes the content hash, touching an existing node on a hit or
    /// creating a fresh one otherwise.
    pub fn add_node(
        &mut self,
        node_type: NodeType,
        content: impl Into<NodeContent>,
        opts: NewNode,
        now: DateTime<Utc>,
    ) -> Node {
        let content = content.into();
        let hash = mnemo_core::content_hash(node_type.as_str(), &content.stable_string());

        if let Some(existing_id) = self.content_hash_to_node.get(&hash).cloned() {
            let node = self.nodes.get_mut(&existing_id).expect("index/node mismatch");
            node.touch(now);
            if let Some(importance) = opts.importance {
                node.importance = node.importance.max(importance);
            }
            return node.clone();
        }

        let mut node = Node::new(node_type, content);
        if let Some(importance) = opts.importance {
            node.importance = importance;
        }
        if let Some(confidence) = opts.confidence {
            node.confidence = confidence;
        }
        node.source = opts.source;
        node.platform = opts.platform;
        for (k, v) in opts.extra {
            node.metadata.extra.insert(k, v);
        }

        if let Some(session_id) = self.active_session.clone() {
            node.session_id = Some(session_id.0.clone());
            if let Some(session) = self.sessions.get_mut(&session_id) {
                session.node_ids.insert(node.id.clone());
            }
        }

        self.nodes_by_type
            .entry(node_type)
            .or_default()
            .insert(node.id.clone());
        self.content_hash_to_node.insert(hash.clone(), node.id.clone());
        self.content_hash_by_node.insert(node.id.clone(), hash);
        self.nodes.insert(node.id.clone(), node.clone());
        node
    }

    pub fn add_edge(
        &mut self,
        source_id: &NodeId,
        target_id: &NodeId,
        edge_type: EdgeType,
        bidirectional: bool,
        now: DateTime<Utc>,
    ) -> Option<Edge> {
        if !self.nodes.contains_key(source_id) || !self.nodes.contains_key(target_id) {
            return None;
        }

        if let Some(existing) = self.find_edge(source_id, target_id, edge_type) {
            let edge = self.edges.get_mut(&existing).expect("index/edge mismatch");
            edge.reinforce(now);
            return Some(edge.clone());
        }

        let edge = Edge::new(source_id.clone(), target_id.clone(), edge_type).bidirectional(bidirectional);
        self.adjacency.entry(source_id.clone()).or_default().insert(edge.id.clone());
        self.adjacency.entry(target_id.clone()).or_default().insert(edge.id.clone());
        self.edges_by_type.entry(edge_type).or_default().insert(edge.id.clone());
        self.edges.insert(edge.id.clone(), edge.clone());
        Some(edge)
    }

    fn find_edge(&self, source_id: &NodeId, target_id: &NodeId, edge_type: EdgeType) -> Option<EdgeId> {
        self.adjacency
            .get(source_id)?
            .iter()
            .find(|edge_id| {
                self.edges
                    .get(*edge_id)
                    .map(|e| e.same_triple(source_id, target_id, edge_type))
                    .unwrap_or(false)
            })
            .cloned()
    }

    pub fn update_node(
        &mut self,
        id: &NodeId,
        content: Option<NodeContent>,
        importance: Option<f64>,
        confidence: Option<f64>,
        now: DateTime<Utc>,
    ) -> Option<Node> {
        let node_type = self.nodes.get(id)?.node_type;

        if let Some(new_content) = content.clone() {
            let old_hash = self.content_hash_by_node.get(id).cloned();
            let new_hash = mnemo_core::content_hash(node_type.as_str(), &new_content.stable_string());
            if let Some(old_hash) = old_hash {
                self.content_hash_to_node.remove(&old_hash);
            }
            self.content_hash_to_node.insert(new_hash.clone(), id.clone());
            self.content_hash_by_node.insert(id.clone(), new_hash);
        }

        let node = self.nodes.get_mut(id)?;
        if let Some(new_content) = content {
            node.content = new_content;
        }
        if let Some(importance) = importance {
            node.importance = importance;
        }
        if let Some(confidence) = confidence {
            node.confidence = confidence;
        }
        node.metadata.updated_at = Some(now);
        Some(node.clone())
    }

    /// Deletes `id` along with every incident edge. Idempotent: removing a
    /// missing id is a no-op.
    pub fn remove_node(&mut self, id: &NodeId) {
        let Some(node) = self.nodes.remove(id) else {
            return;
        };

        self.nodes_by_type.entry(node.node_type).or_default().remove(id);
        if let Some(hash) = self.content_hash_by_node.remove(id) {
            self.content_hash_to_node.remove(&hash);
        }

        if let Some(edge_ids) = self.adjacency.remove(id) {
            for edge_id in edge_ids {
                if let Some(edge) = self.edges.remove(&edge_id) {
                    self.edges_by_type.entry(edge.edge_type).or_default().remove(&edge_id);
                    let other = if &edge.source_id == id { &edge.target_id } else { &edge.source_id };
                    if let Some(set) = self.adjacency.get_mut(other) {
                        set.remove(&edge_id);
                    }
                }
            }
        }

        if let Some(session_id) = node.session_id.as_ref() {
            if let Some(session) = self.sessions.get_mut(&SessionId(session_id.clone())) {
                session.node_ids.remove(id);
            }
        }
    }

    pub fn query(&self, criteria: &NodeQuery, now: DateTime<Utc>) -> Vec<Node> {
        let mut candidates: Vec<&Node> = match &criteria.types {
            Some(types) => types
                .iter()
                .filter_map(|t| self.nodes_by_type.get(t))
                .flatten()
                .filter_map(|id| self.nodes.get(id))
                .collect(),
            None => self.nodes.values().collect(),
        };

        if let Some(platform) = &criteria.platform {
            candidates.retain(|n| n.platform.as_deref() == Some(platform.as_str()));
        }
        if let Some(session_id) = &criteria.session_id {
            candidates.retain(|n| n.session_id.as_deref() == Some(session_id.as_str()));
        }
        if let Some(substr) = &criteria.content_contains {
            let needle = substr.to_lowercase();
            candidates.retain(|n| n.content.stable_string().to_lowercase().contains(&needle));
        }
        if let Some(min_relevance) = criteria.min_relevance {
            candidates.retain(|n| n.relevance_score(now) >= min_relevance);
        }
        if let Some(within_hours) = criteria.within_hours {
            candidates.retain(|n| n.age_hours(now) <= within_hours);
        }

        match criteria.sort {
            QuerySort::Relevance => {
                candidates.sort_by(|a, b| {
                    b.relevance_score(now)
                        .partial_cmp(&a.relevance_score(now))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            }
            QuerySort::Created => {
                candidates.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
            }
            QuerySort::Accessed => {
                candidates.sort_by(|a, b| b.metadata.last_accessed_at.cmp(&a.metadata.last_accessed_at));
            }
        }

        if let Some(limit) = criteria.limit {
            candidates.truncate(limit);
        }

        candidates.into_iter().cloned().collect()
    }

    /// Bidirectional breadth-limited traversal from `start`, returning every
    /// node and edge reached within `depth` hops.
    pub fn get_subgraph(&self, start: &NodeId, depth: usize) -> (Vec<Node>, Vec<Edge>) {
        let mut visited_nodes: HashSet<NodeId> = HashSet::new();
        let mut visited_edges: HashSet<EdgeId> = HashSet::new();

        if !self.nodes.contains_key(start) {
            return (Vec::new(), Vec::new());
        }

        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
        queue.push_back((start.clone(), 0));
        visited_nodes.insert(start.clone());

        while let Some((current, dist)) = queue.pop_front() {
            if dist >= depth {
                continue;
            }
            let Some(edge_ids) = self.adjacency.get(&current) else {
                continue;
            };
            for edge_id in edge_ids {
                let Some(edge) = self.edges.get(edge_id) else { continue };
                visited_edges.insert(edge_id.clone());
                let other = if &edge.source_id == &current { &edge.target_id } else { &edge.source_id };
                if visited_nodes.insert(other.clone()) {
                    queue.push_back((other.clone(), dist + 1));
                }
            }
        }

        let nodes = visited_nodes
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .cloned()
            .collect();
        let edges = visited_edges
            .iter()
            .filter_map(|id| self.edges.get(id))
            .cloned()
            .collect();
        (nodes, edges)
    }

    pub fn apply_decay(&mut self, amount: Option<f64>) {
        let amount = amount.unwrap_or(DEFAULT_DECAY_AMOUNT);
        for node in self.nodes.values_mut() {
            node.decay = (node.decay - amount).max(mnemo_types::graph::MIN_DECAY);
        }
    }

    /// Deletes nodes older than `min_age_hours` whose relevance is below
    /// `min_relevance`. Incident edges are removed transitively.
    pub fn prune(&mut self, min_relevance: Option<f64>, min_age_hours: Option<f64>, now: DateTime<Utc>) -> usize {
        let min_relevance = min_relevance.unwrap_or(DEFAULT_PRUNE_MIN_RELEVANCE);
        let min_age_hours = min_age_hours.unwrap_or(DEFAULT_PRUNE_MIN_AGE_HOURS);

        let stale: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.age_hours(now) >= min_age_hours && n.relevance_score(now) < min_relevance)
            .map(|n| n.id.clone())
            .collect();

        let removed = stale.len();
        for id in stale {
            self.remove_node(&id);
        }
        removed
    }

    pub fn start_session(&mut self, meta: SessionMeta, now: DateTime<Utc>) -> Session {
        self.end_session(now);
        let session = Session::start(meta, now);
        self.active_session = Some(session.id.clone());
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    pub fn end_session(&mut self, now: DateTime<Utc>) {
        if let Some(id) = self.active_session.take() {
            if let Some(session) = self.sessions.get_mut(&id) {
                session.end(now);
            }
        }
    }

    pub fn get_recent_sessions(&self, limit: usize) -> Vec<Session> {
        let mut sessions: Vec<&Session> = self.sessions.values().collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions.into_iter().take(limit).cloned().collect()
    }

    pub fn session_mut(&mut self, id: &SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(id)
    }

    pub fn has_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    /// Called by the sync layer after it applies any local or remote
    /// mutation, so `stats().lastModified` reflects it.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_modified = Some(now);
    }

    pub fn stats(&self) -> serde_json::Value {
        serde_json::json!({
            "nodeCount": self.nodes.len(),
            "edgeCount": self.edges.len(),
            "sessionCount": self.sessions.len(),
            "lastModified": self.last_modified,
        })
    }

    /// Inserts or replaces `node` under its own id, bypassing content-hash
    /// dedup — used when applying an already-assigned node received from a
    /// peer tab.
    pub fn upsert_remote_node(&mut self, node: Node) {
        if let Some(old) = self.nodes.get(&node.id) {
            self.nodes_by_type.entry(old.node_type).or_default().remove(&node.id);
        }
        if let Some(old_hash) = self.content_hash_by_node.remove(&node.id) {
            self.content_hash_to_node.remove(&old_hash);
        }

        let hash = mnemo_core::content_hash(node.node_type.as_str(), &node.content.stable_string());
        self.nodes_by_type.entry(node.node_type).or_default().insert(node.id.clone());
        self.content_hash_to_node.insert(hash.clone(), node.id.clone());
        self.content_hash_by_node.insert(node.id.clone(), hash);
        self.nodes.insert(node.id.clone(), node);
    }

    /// Inserts `edge` iff no edge with that id already exists. Returns
    /// whether it was inserted — edges received from peers are add-once.
    pub fn upsert_remote_edge_if_absent(&mut self, edge: Edge) -> bool {
        if self.edges.contains_key(&edge.id) {
            return false;
        }
        self.adjacency.entry(edge.source_id.clone()).or_default().insert(edge.id.clone());
        self.adjacency.entry(edge.target_id.clone()).or_default().insert(edge.id.clone());
        self.edges_by_type.entry(edge.edge_type).or_default().insert(edge.id.clone());
        self.edges.insert(edge.id.clone(), edge);
        true
    }

    /// Idempotent edge delete, for applying a peer's `EdgeRemoved`.
    pub fn remove_edge(&mut self, id: &EdgeId) {
        if let Some(edge) = self.edges.remove(id) {
            self.edges_by_type.entry(edge.edge_type).or_default().remove(id);
            if let Some(set) = self.adjacency.get_mut(&edge.source_id) {
                set.remove(id);
            }
            if let Some(set) = self.adjacency.get_mut(&edge.target_id) {
                set.remove(id);
            }
        }
    }

    pub fn upsert_remote_session_if_absent(&mut self, session: Session) {
        self.sessions.entry(session.id.clone()).or_insert(session);
    }

    pub fn mark_session_ended_remote(&mut self, id: &SessionId, ended_at: DateTime<Utc>) {
        if let Some(session) = self.sessions.get_mut(id) {
            session.end(ended_at);
        }
    }

    /// Replaces the entire in-memory graph with `other` — used when a
    /// non-leader adopts a leader's full-sync snapshot.
    pub fn replace_with(&mut self, other: MemoryGraph) {
        *self = other;
    }

    /// Live nodes, edges, and sessions, for handing to a `GraphStore`'s
    /// `save_graph`.
    pub fn snapshot(&self) -> (Vec<Node>, Vec<Edge>, Vec<Session>) {
        (
            self.nodes.values().cloned().collect(),
            self.edges.values().cloned().collect(),
            self.sessions.values().cloned().collect(),
        )
    }

    pub fn to_json(&self) -> serde_json::Value {
        let snapshot = GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
            sessions: self.sessions.values().cloned().collect(),
            active_session: self.active_session.clone(),
        };
        serde_json::to_value(&snapshot).unwrap_or(serde_json::Value::Null)
    }

    /// Rebuilds a graph from persisted rows (`GraphStore::load_graph`),
    /// recomputing every derived index the way `from_json` does. The active
    /// session, if any, is whichever stored session still has `is_active` set.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>, sessions: Vec<Session>) -> Self {
        let mut graph = Self::new();
        let active_session = sessions.iter().find(|s| s.is_active).map(|s| s.id.clone());

        for session in sessions {
            graph.sessions.insert(session.id.clone(), session);
        }
        graph.active_session = active_session;

        for node in nodes {
            let hash = mnemo_core::content_hash(node.node_type.as_str(), &node.content.stable_string());
            graph.nodes_by_type.entry(node.node_type).or_default().insert(node.id.clone());
            graph.content_hash_to_node.insert(hash.clone(), node.id.clone());
            graph.content_hash_by_node.insert(node.id.clone(), hash);
            graph.nodes.insert(node.id.clone(), node);
        }

        for edge in edges {
            graph.adjacency.entry(edge.source_id.clone()).or_default().insert(edge.id.clone());
            graph.adjacency.entry(edge.target_id.clone()).or_default().insert(edge.id.clone());
            graph.edges_by_type.entry(edge.edge_type).or_default().insert(edge.id.clone());
            graph.edges.insert(edge.id.clone(), edge);
        }

        graph
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        let snapshot: GraphSnapshot = serde_json::from_value(value.clone())?;
        let mut graph = Self::new();

        for session in snapshot.sessions {
            graph.sessions.insert(session.id.clone(), session);
        }
        graph.active_session = snapshot.active_session;

        for node in snapshot.nodes {
            let hash = mnemo_core::content_hash(node.node_type.as_str(), &node.content.stable_string());
            graph.nodes_by_type.entry(node.node_type).or_default().insert(node.id.clone());
            graph.content_hash_to_node.insert(hash.clone(), node.id.clone());
            graph.content_hash_by_node.insert(node.id.clone(), hash);
            graph.nodes.insert(node.id.clone(), node);
        }

        for edge in snapshot.edges {
            graph.adjacency.entry(edge.source_id.clone()).or_default().insert(edge.id.clone());
            graph.adjacency.entry(edge.target_id.clone()).or_default().insert(edge.id.clone());
            graph.edges_by_type.entry(edge.edge_type).or_default().insert(edge.id.clone());
            graph.edges.insert(edge.id.clone(), edge);
        }

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_types::graph::EdgeType;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn add_node_dedupes_by_content_hash() {
        let mut graph = MemoryGraph::new();
        let first = graph.add_node(NodeType::Language, "python", NewNode::default(), now());
        let second = graph.add_node(NodeType::Language, "python", NewNode::default(), now());
        assert_eq!(first.id, second.id);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.get_node(&first.id).unwrap().metadata.access_count, 1);
    }

    #[test]
    fn add_edge_reinforces_existing_triple() {
        let mut graph = MemoryGraph::new();
        let a = graph.add_node(NodeType::Framework, "axum", NewNode::default(), now());
        let b = graph.add_node(NodeType::Language, "rust", NewNode::default(), now());

        let e1 = graph.add_edge(&a.id, &b.id, EdgeType::Uses, false, now()).unwrap();
        let e2 = graph.add_edge(&a.id, &b.id, EdgeType::Uses, false, now()).unwrap();
        assert_eq!(e1.id, e2.id);
        assert!(e2.weight > e1.weight || (e2.weight - e1.weight).abs() < 1e-9 && e2.weight == 1.1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn add_edge_missing_node_returns_none() {
        let mut graph = MemoryGraph::new();
        let missing = NodeId::generate();
        let a = graph.add_node(NodeType::Topic, "databases", NewNode::default(), now());
        assert!(graph.add_edge(&a.id, &missing, EdgeType::RelatedTo, false, now()).is_none());
    }

    #[test]
    fn remove_node_clears_incident_edges() {
        let mut graph = MemoryGraph::new();
        let a = graph.add_node(NodeType::Error, "panic", NewNode::default(), now());
        let b = graph.add_node(NodeType::CodeBlock, "fn main() {}", NewNode::default(), now());
        let edge = graph.add_edge(&a.id, &b.id, EdgeType::RelatedTo, false, now()).unwrap();

        graph.remove_node(&a.id);
        assert!(graph.get_node(&a.id).is_none());
        assert!(graph.get_edge(&edge.id).is_none());
        assert_eq!(graph.edge_count(), 0);

        // idempotent
        graph.remove_node(&a.id);
    }

    #[test]
    fn query_filters_by_type_and_sorts_by_relevance() {
        let mut graph = MemoryGraph::new();
        graph.add_node(NodeType::Language, "rust", NewNode { importance: Some(0.9), ..Default::default() }, now());
        graph.add_node(NodeType::Language, "cobol", NewNode { importance: Some(0.1), ..Default::default() }, now());
        graph.add_node(NodeType::Framework, "axum", NewNode::default(), now());

        let mut types = HashSet::new();
        types.insert(NodeType::Language);
        let results = graph.query(
            &NodeQuery { types: Some(types), ..Default::default() },
            now(),
        );
        assert_eq!(results.len(), 2);
        assert!(results[0].importance >= results[1].importance);
    }

    #[test]
    fn subgraph_respects_depth() {
        let mut graph = MemoryGraph::new();
        let a = graph.add_node(NodeType::Topic, "a", NewNode::default(), now());
        let b = graph.add_node(NodeType::Topic, "b", NewNode::default(), now());
        let c = graph.add_node(NodeType::Topic, "c", NewNode::default(), now());
        graph.add_edge(&a.id, &b.id, EdgeType::RelatedTo, false, now());
        graph.add_edge(&b.id, &c.id, EdgeType::RelatedTo, false, now());

        let (nodes, _edges) = graph.get_subgraph(&a.id, 1);
        let ids: HashSet<NodeId> = nodes.into_iter().map(|n| n.id).collect();
        assert!(ids.contains(&a.id));
        assert!(ids.contains(&b.id));
        assert!(!ids.contains(&c.id));
    }

    #[test]
    fn sessions_start_end_and_recent_order() {
        let mut graph = MemoryGraph::new();
        let meta = SessionMeta { platform: Some("chatgpt".into()), ..Default::default() };
        let s1 = graph.start_session(meta.clone(), now());
        assert!(graph.active_session().is_some());

        let s2 = graph.start_session(meta, now());
        assert_ne!(s1.id, s2.id);

        let recent = graph.get_recent_sessions(10);
        assert_eq!(recent[0].id, s2.id);
    }

    #[test]
    fn from_parts_recovers_active_session_and_dedup_index() {
        let mut seed = MemoryGraph::new();
        seed.start_session(SessionMeta { platform: Some("chatgpt".into()), ..Default::default() }, now());
        seed.add_node(NodeType::Language, "rust", NewNode::default(), now());
        let (nodes, edges, sessions) = seed.snapshot();

        let mut restored = MemoryGraph::from_parts(nodes, edges, sessions);
        assert!(restored.active_session().is_some());
        let touched = restored.add_node(NodeType::Language, "rust", NewNode::default(), now());
        assert_eq!(restored.node_count(), 1);
        assert_eq!(touched.metadata.access_count, 1);
    }

    #[test]
    fn json_roundtrip_preserves_dedup_index() {
        let mut graph = MemoryGraph::new();
        graph.add_node(NodeType::Language, "rust", NewNode::default(), now());
        let json = graph.to_json();

        let mut restored = MemoryGraph::from_json(&json).unwrap();
        let touched = restored.add_node(NodeType::Language, "rust", NewNode::default(), now());
        assert_eq!(restored.node_count(), 1);
        assert_eq!(touched.metadata.access_count, 1);
    }
}
