use chrono::{DateTime, Duration, Utc};

use crate::message::TabId;

/// Time a tab waits after a `LeaderQuery` for a `LeaderAnnounce` before
/// assuming no leader exists and claiming the role itself.
pub const ELECTION_WAIT_MS: i64 = 200;
pub const HEARTBEAT_INTERVAL_MS: i64 = 5_000;
pub const TAKEOVER_THRESHOLD_MS: i64 = 15_000;

/// Tracks this tab's view of cross-tab leadership. Every transition takes
/// `now` explicitly rather than reading the wall clock, so the whole protocol
/// can be driven deterministically from tests.
pub struct LeaderElection {
    tab_id: TabId,
    is_leader: bool,
    leader_id: Option<TabId>,
    leader_last_seen: Option<DateTime<Utc>>,
    election_started_at: Option<DateTime<Utc>>,
    last_heartbeat_sent: Option<DateTime<Utc>>,
}

impl LeaderElection {
    pub fn new(tab_id: TabId) -> Self {
        Self {
            tab_id,
            is_leader: false,
            leader_id: None,
            leader_last_seen: None,
            election_started_at: None,
            last_heartbeat_sent: None,
        }
    }

    pub fn is_leader(&self) -> bool {
        self.is_leader
    }

    pub fn leader_id(&self) -> Option<&TabId> {
        self.leader_id.as_ref()
    }

    /// Called once on startup: emits `LeaderQuery` and starts the wait timer.
    pub fn start_election(&mut self, now: DateTime<Utc>) {
        self.election_started_at = Some(now);
    }

    /// Whether `ELECTION_WAIT_MS` has elapsed since `start_election` with no
    /// `LeaderAnnounce` received — if so, this tab should claim leadership.
    pub fn should_claim_after_silence(&self, now: DateTime<Utc>) -> bool {
        if self.leader_id.is_some() {
            return false;
        }
        match self.election_started_at {
            Some(started) => now - started >= Duration::milliseconds(ELECTION_WAIT_MS),
            None => false,
        }
    }

    /// Applies a received `LeaderAnnounce` or `LeaderClaim` from `other`:
    /// lexicographically smaller tab id wins ties when both claim at once.
    pub fn on_leader_claim(&mut self, other: &TabId, now: DateTime<Utc>) {
        let should_adopt = match &self.leader_id {
            None => true,
            Some(_current) if self.is_leader => other < &self.tab_id,
            Some(current) => other <= current,
        };
        if should_adopt {
            self.is_leader = false;
            self.leader_id = Some(other.clone());
            self.leader_last_seen = Some(now);
        }
    }

    pub fn claim_leadership(&mut self, now: DateTime<Utc>) {
        self.is_leader = true;
        self.leader_id = Some(self.tab_id.clone());
        self.leader_last_seen = Some(now);
    }

    pub fn on_leader_announce(&mut self, leader: &TabId, now: DateTime<Utc>) {
        self.is_leader = leader == &self.tab_id;
        self.leader_id = Some(leader.clone());
        self.leader_last_seen = Some(now);
    }

    pub fn on_heartbeat(&mut self, from: &TabId, now: DateTime<Utc>) {
        if self.leader_id.as_ref() == Some(from) {
            self.leader_last_seen = Some(now);
        }
    }

    pub fn on_leader_release(&mut self, from: &TabId) {
        if self.leader_id.as_ref() == Some(from) {
            self.leader_id = None;
            self.leader_last_seen = None;
            self.is_leader = false;
        }
    }

    /// True once the current leader has gone silent for longer than
    /// `TAKEOVER_THRESHOLD_MS`, meaning this tab should start a fresh
    /// election.
    pub fn should_start_takeover(&self, now: DateTime<Utc>) -> bool {
        if self.is_leader {
            return false;
        }
        match self.leader_last_seen {
            Some(seen) => now - seen >= Duration::milliseconds(TAKEOVER_THRESHOLD_MS),
            None => self.leader_id.is_none(),
        }
    }

    pub fn should_send_heartbeat(&self, now: DateTime<Utc>) -> bool {
        if !self.is_leader {
            return false;
        }
        match self.last_heartbeat_sent {
            Some(sent) => now - sent >= Duration::milliseconds(HEARTBEAT_INTERVAL_MS),
            None => true,
        }
    }

    pub fn record_heartbeat_sent(&mut self, now: DateTime<Utc>) {
        self.last_heartbeat_sent = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(id: &str) -> TabId {
        TabId(id.to_string())
    }

    #[test]
    fn claims_leadership_after_silence() {
        let mut e = LeaderElection::new(t("tab_b"));
        let t0 = Utc::now();
        e.start_election(t0);
        assert!(!e.should_claim_after_silence(t0));
        let later = t0 + Duration::milliseconds(250);
        assert!(e.should_claim_after_silence(later));
        e.claim_leadership(later);
        assert!(e.is_leader());
    }

    #[test]
    fn lexicographically_smaller_tab_wins_simultaneous_claim() {
        let mut e = LeaderElection::new(t("tab_b"));
        let t0 = Utc::now();
        e.claim_leadership(t0);
        assert!(e.is_leader());

        e.on_leader_claim(&t("tab_a"), t0);
        assert!(!e.is_leader());
        assert_eq!(e.leader_id(), Some(&t("tab_a")));
    }

    #[test]
    fn takeover_triggers_after_threshold_with_no_heartbeat() {
        let mut e = LeaderElection::new(t("tab_b"));
        let t0 = Utc::now();
        e.on_leader_announce(&t("tab_a"), t0);
        assert!(!e.should_start_takeover(t0));
        let later = t0 + Duration::milliseconds(16_000);
        assert!(e.should_start_takeover(later));
    }

    #[test]
    fn leader_release_clears_state() {
        let mut e = LeaderElection::new(t("tab_b"));
        let t0 = Utc::now();
        e.on_leader_announce(&t("tab_a"), t0);
        e.on_leader_release(&t("tab_a"));
        assert!(e.should_start_takeover(t0));
    }
}
