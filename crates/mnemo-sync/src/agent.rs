use chrono::{DateTime, Utc};

use mnemo_engine::MemoryGraph;

use crate::conflict::apply_remote_message;
use crate::election::LeaderElection;
use crate::message::{Message, TabId};
use crate::transport::Transport;

/// Binds one tab's transport and leader-election state together, and drives
/// both the outbound broadcast of local mutations and the inbound
/// application of peers' mutations to a `MemoryGraph`.
pub struct SyncAgent<T: Transport> {
    transport: T,
    election: LeaderElection,
}

impl<T: Transport> SyncAgent<T> {
    pub fn new(transport: T) -> Self {
        let tab_id = transport.tab_id().clone();
        Self {
            transport,
            election: LeaderElection::new(tab_id),
        }
    }

    pub fn tab_id(&self) -> &TabId {
        self.transport.tab_id()
    }

    pub fn is_leader(&self) -> bool {
        self.election.is_leader()
    }

    pub fn start_election(&mut self, now: DateTime<Utc>) {
        self.election.start_election(now);
        self.transport.post(Message::LeaderQuery { tab_id: self.tab_id().0.clone() });
    }

    pub fn broadcast(&self, msg: Message) {
        self.transport.post(msg);
    }

    /// Drains every message waiting on the transport, applies graph
    /// mutations to `graph`, updates election state from leadership/
    /// heartbeat traffic, and answers `RequestFullSync` / `LeaderQuery`
    /// when this tab is the leader. Returns the number of messages that
    /// mutated `graph`.
    pub fn pump(&mut self, graph: &mut MemoryGraph, now: DateTime<Utc>) -> usize {
        let own = self.tab_id().clone();
        let mut mutations = 0;

        for msg in self.transport.drain() {
            match &msg {
                Message::LeaderClaim { tab_id } => {
                    self.election.on_leader_claim(&TabId(tab_id.clone()), now);
                }
                Message::LeaderAnnounce { tab_id } => {
                    self.election.on_leader_announce(&TabId(tab_id.clone()), now);
                }
                Message::LeaderRelease { tab_id } => {
                    self.election.on_leader_release(&TabId(tab_id.clone()));
                }
                Message::Heartbeat { tab_id } => {
                    self.election.on_heartbeat(&TabId(tab_id.clone()), now);
                }
                Message::LeaderQuery { tab_id } => {
                    if self.election.is_leader() {
                        self.transport.post(Message::LeaderAnnounce { tab_id: own.0.clone() });
                    }
                    let _ = tab_id;
                }
                Message::RequestFullSync { tab_id } => {
                    if self.election.is_leader() {
                        self.transport.post(Message::FullSyncResponse {
                            tab_id: own.0.clone(),
                            target_tab_id: tab_id.clone(),
                            graph: graph.to_json(),
                            stats: graph.stats(),
                        });
                    }
                }
                Message::FullSyncResponse { target_tab_id, graph: snapshot, stats, .. } => {
                    if target_tab_id == &own.0 {
                        let incoming_modified: Option<DateTime<Utc>> = stats
                            .get("lastModified")
                            .and_then(|v| serde_json::from_value(v.clone()).ok());
                        let is_newer = match graph.last_modified() {
                            None => true,
                            Some(local) => incoming_modified.is_some_and(|incoming| incoming > local),
                        };
                        if is_newer {
                            if let Ok(replacement) = MemoryGraph::from_json(snapshot) {
                                graph.replace_with(replacement);
                                mutations += 1;
                            }
                        }
                    }
                }
                _ => {
                    if apply_remote_message(graph, &msg, &own, now) {
                        mutations += 1;
                    }
                }
            }
        }

        if self.election.should_claim_after_silence(now) {
            self.election.claim_leadership(now);
            self.transport.post(Message::LeaderClaim { tab_id: own.0.clone() });
        }

        if self.election.should_start_takeover(now) {
            self.start_election(now);
        }

        if self.election.should_send_heartbeat(now) {
            self.transport.post(Message::Heartbeat { tab_id: own.0.clone() });
            self.election.record_heartbeat_sent(now);
        }

        mutations
    }

    pub fn request_full_sync(&self) {
        self.transport.post(Message::RequestFullSync { tab_id: self.tab_id().0.clone() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Hub;
    use mnemo_engine::NewNode;
    use mnemo_types::graph::NodeType;

    #[test]
    fn leader_answers_full_sync_request_and_follower_adopts_snapshot() {
        let hub = Hub::new();
        let t0 = Utc::now();

        let mut leader = SyncAgent::new(hub.join(TabId("tab_a".into())));
        let mut follower = SyncAgent::new(hub.join(TabId("tab_b".into())));

        let mut leader_graph = MemoryGraph::new();
        leader_graph.add_node(NodeType::Goal, "ship the sync layer", NewNode::default(), t0);
        leader.election.claim_leadership(t0);

        let mut follower_graph = MemoryGraph::new();
        follower.request_full_sync();
        leader.pump(&mut leader_graph, t0);
        let mutated = follower.pump(&mut follower_graph, t0);

        assert_eq!(mutated, 1);
        assert_eq!(follower_graph.node_count(), 1);
    }

    #[test]
    fn follower_claims_leadership_after_election_silence() {
        let hub = Hub::new();
        let mut agent = SyncAgent::new(hub.join(TabId("tab_a".into())));
        let mut graph = MemoryGraph::new();
        let t0 = Utc::now();

        agent.start_election(t0);
        agent.pump(&mut graph, t0);
        assert!(!agent.is_leader());

        let later = t0 + chrono::Duration::milliseconds(250);
        agent.pump(&mut graph, later);
        assert!(agent.is_leader());
    }
}
