use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

pub const MAX_ATTEMPTS: u32 = 5;
pub const BASE_BACKOFF_MS: i64 = 60_000;
pub const MAX_BACKOFF_MS: i64 = 600_000;
pub const MAX_JOBS_PER_PUMP: usize = 3;
pub const RESPONSE_TRUNCATE_BYTES: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(rename = "type")]
    pub job_type: String,
    pub connector_id: String,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub kind: Option<String>,
    pub status: JobStatus,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_response: Option<String>,
    pub error: String,
}

impl Job {
    pub fn new(
        id: String,
        connector_id: String,
        payload: serde_json::Value,
        headers: HashMap<String, String>,
        kind: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            job_type: "webhook".to_string(),
            connector_id,
            payload,
            headers,
            kind,
            status: JobStatus::Queued,
            attempts: 0,
            created_at: now,
            updated_at: now,
            next_run_at: None,
            last_response: None,
            error: String::new(),
        }
    }

    /// `min(60_000 * attempts, 600_000)`, per §4.7.
    pub fn backoff_ms(attempts: u32) -> i64 {
        (BASE_BACKOFF_MS * attempts as i64).min(MAX_BACKOFF_MS)
    }

    pub fn is_runnable(&self, now: DateTime<Utc>) -> bool {
        if matches!(self.status, JobStatus::Done | JobStatus::Running) {
            return false;
        }
        match self.next_run_at {
            Some(t) => t <= now,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobDocument {
    pub by_id: HashMap<String, Job>,
    pub order: Vec<String>,
}
