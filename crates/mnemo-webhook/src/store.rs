//! Persists the job queue document `{byId, order}` through the same
//! `KvStore` abstraction the conversation store uses.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mnemo_index::KvStore;
use mnemo_types::job::{Job, JobDocument, JobStatus};

use crate::error::Result;

const COLLECTION: &str = "jobs";
const DOC_KEY: &str = "document";

pub struct JobStore<'a> {
    kv: &'a dyn KvStore,
}

impl<'a> JobStore<'a> {
    pub fn new(kv: &'a dyn KvStore) -> Self {
        Self { kv }
    }

    fn load(&self) -> Result<JobDocument> {
        Ok(self
            .kv
            .get(COLLECTION, DOC_KEY)?
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default())
    }

    fn persist(&self, doc: &JobDocument) -> Result<()> {
        self.kv.put(COLLECTION, DOC_KEY, &serde_json::to_value(doc)?)?;
        Ok(())
    }

    /// Creates a job in state `queued` at the head of `order`.
    pub fn enqueue(
        &self,
        connector_id: String,
        payload: serde_json::Value,
        headers: HashMap<String, String>,
        kind: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Job> {
        let mut doc = self.load()?;
        let id = format!("job_{}", uuid::Uuid::new_v4().simple());
        let job = Job::new(id.clone(), connector_id, payload, headers, kind, now);
        doc.by_id.insert(id.clone(), job.clone());
        doc.order.insert(0, id);
        self.persist(&doc)?;
        Ok(job)
    }

    pub fn get(&self, id: &str) -> Result<Option<Job>> {
        Ok(self.load()?.by_id.get(id).cloned())
    }

    /// All jobs, newest first (i.e. `order` as stored).
    pub fn list(&self) -> Result<Vec<Job>> {
        let doc = self.load()?;
        Ok(doc.order.iter().filter_map(|id| doc.by_id.get(id)).cloned().collect())
    }

    /// Ids in oldest-first order, for the pump's scan.
    pub fn oldest_first_ids(&self) -> Result<Vec<String>> {
        let mut ids = self.load()?.order;
        ids.reverse();
        Ok(ids)
    }

    pub fn save(&self, job: &Job) -> Result<()> {
        let mut doc = self.load()?;
        doc.by_id.insert(job.id.clone(), job.clone());
        self.persist(&doc)
    }

    pub fn runnable_count(&self, now: DateTime<Utc>) -> Result<usize> {
        Ok(self.load()?.by_id.values().filter(|j| j.is_runnable(now)).count())
    }

    pub fn count_by_status(&self, status: JobStatus) -> Result<usize> {
        Ok(self.load()?.by_id.values().filter(|j| j.status == status).count())
    }
}
