use chrono::{DateTime, Utc};

use mnemo_engine::MemoryGraph;
use mnemo_types::graph::NodeId;
use mnemo_types::session::SessionId;

use crate::message::{Message, TabId};

/// Applies a message received from another tab to `graph`, following the
/// per-message conflict rule: newer-wins for node mutations, add-once for
/// edges, idempotent removal for deletes. Returns `true` if `graph` was
/// actually mutated.
///
/// Messages a tab broadcast itself (looped back by a naive transport) are
/// ignored by comparing `msg.tab_id()` against `own_tab_id`.
pub fn apply_remote_message(
    graph: &mut MemoryGraph,
    msg: &Message,
    own_tab_id: &TabId,
    now: DateTime<Utc>,
) -> bool {
    if msg.tab_id() == own_tab_id.0 {
        return false;
    }

    let mutated = match msg {
        Message::NodeAdded { node, .. } => apply_node_update(graph, node),
        Message::NodeUpdated { node, .. } => apply_node_update(graph, node),
        Message::NodeRemoved { node_id, .. } => remove_node_if_present(graph, node_id),
        Message::EdgeAdded { edge, .. } => graph.upsert_remote_edge_if_absent(edge.clone()),
        Message::EdgeRemoved { edge_id, .. } => {
            let existed = graph.get_edge(edge_id).is_some();
            graph.remove_edge(edge_id);
            existed
        }
        Message::SessionStarted { session, .. } => apply_session_started(graph, session),
        Message::SessionEnded { session_id, ended_at, .. } => {
            apply_session_ended(graph, session_id, *ended_at)
        }
        Message::RequestFullSync { .. }
        | Message::FullSyncResponse { .. }
        | Message::Heartbeat { .. }
        | Message::LeaderClaim { .. }
        | Message::LeaderRelease { .. }
        | Message::LeaderQuery { .. }
        | Message::LeaderAnnounce { .. } => false,
    };

    if mutated {
        graph.touch(now);
    }
    mutated
}

fn apply_node_update(graph: &mut MemoryGraph, incoming: &mnemo_types::graph::Node) -> bool {
    match graph.get_node(&incoming.id) {
        None => {
            graph.upsert_remote_node(incoming.clone());
            true
        }
        Some(existing) => {
            let existing_ts = existing.metadata.updated_at;
            let incoming_ts = incoming.metadata.updated_at;
            if incoming_ts > existing_ts {
                graph.upsert_remote_node(incoming.clone());
                true
            } else {
                false
            }
        }
    }
}

fn remove_node_if_present(graph: &mut MemoryGraph, node_id: &NodeId) -> bool {
    let existed = graph.has_node(node_id);
    if existed {
        graph.remove_node(node_id);
    }
    existed
}

fn apply_session_started(graph: &mut MemoryGraph, session: &mnemo_types::session::Session) -> bool {
    let existed = graph.get_recent_sessions(usize::MAX).iter().any(|s| s.id == session.id);
    if !existed {
        graph.upsert_remote_session_if_absent(session.clone());
    }
    !existed
}

fn apply_session_ended(graph: &mut MemoryGraph, session_id: &str, ended_at: DateTime<Utc>) -> bool {
    let id = SessionId(session_id.to_string());
    let was_active = graph
        .get_recent_sessions(usize::MAX)
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.is_active)
        .unwrap_or(false);
    if was_active {
        graph.mark_session_ended_remote(&id, ended_at);
    }
    was_active
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_engine::{MemoryGraph, NewNode};
    use mnemo_types::graph::NodeType;

    fn tabs() -> (TabId, TabId) {
        (TabId("tab_a".into()), TabId("tab_b".into()))
    }

    #[test]
    fn own_message_is_ignored() {
        let (a, _b) = tabs();
        let mut graph = MemoryGraph::new();
        let now = Utc::now();
        let mut remote = MemoryGraph::new();
        let node = remote.add_node(NodeType::Goal, "do the thing", NewNode::default(), now);
        let msg = crate::message::node_added(&a, node);
        assert!(!apply_remote_message(&mut graph, &msg, &a, now));
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn new_node_from_peer_is_added_once() {
        let (a, b) = tabs();
        let mut graph = MemoryGraph::new();
        let now = Utc::now();
        let mut remote = MemoryGraph::new();
        let node = remote.add_node(NodeType::Goal, "do the thing", NewNode::default(), now);
        let msg = crate::message::node_added(&a, node.clone());

        assert!(apply_remote_message(&mut graph, &msg, &b, now));
        assert_eq!(graph.node_count(), 1);
        // replaying the same message again is a no-op, not a duplicate
        assert!(!apply_remote_message(&mut graph, &msg, &b, now));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn node_update_only_applies_if_newer() {
        let (a, b) = tabs();
        let now = Utc::now();
        let mut graph = MemoryGraph::new();
        let node = graph.add_node(NodeType::Goal, "v1", NewNode::default(), now);

        let mut stale = node.clone();
        stale.metadata.updated_at = Some(now - chrono::Duration::seconds(10));
        stale.content = mnemo_types::graph::NodeContent::Text("stale update".into());
        let stale_msg = crate::message::node_updated(&a, stale);
        assert!(!apply_remote_message(&mut graph, &stale_msg, &b, now));

        let mut fresh = node.clone();
        fresh.metadata.updated_at = Some(now + chrono::Duration::seconds(10));
        fresh.content = mnemo_types::graph::NodeContent::Text("fresh update".into());
        let fresh_msg = crate::message::node_updated(&a, fresh);
        assert!(apply_remote_message(&mut graph, &fresh_msg, &b, now));
    }

    #[test]
    fn edge_removed_is_idempotent() {
        let (a, b) = tabs();
        let now = Utc::now();
        let mut graph = MemoryGraph::new();
        let n1 = graph.add_node(NodeType::Goal, "n1", NewNode::default(), now);
        let n2 = graph.add_node(NodeType::Goal, "n2", NewNode::default(), now);
        let edge = graph
            .add_edge(&n1.id, &n2.id, mnemo_types::graph::EdgeType::RelatedTo, false, now)
            .unwrap();

        let msg = crate::message::edge_removed(&a, edge.id.clone());
        assert!(apply_remote_message(&mut graph, &msg, &b, now));
        assert!(!apply_remote_message(&mut graph, &msg, &b, now));
    }
}
