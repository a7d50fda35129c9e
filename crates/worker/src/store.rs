//! In-memory result store.
//!
//! Maps job ids to [`JobRecord`]s. The job client inserts the pending record;
//! afterwards only the worker that claimed the job moves it forward. Reads
//! are concurrent. Every accepted transition is published on the
//! [`EventBus`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jobline_core::job::{JobFailure, JobKind, JobOutput, JobRecord, JobState, Resolution};
use jobline_core::types::JobId;
use jobline_events::{EventBus, JobEvent};
use tokio::sync::RwLock;

pub struct ResultStore {
    records: RwLock<HashMap<JobId, JobRecord>>,
    events: Arc<EventBus>,
}

impl ResultStore {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Record a newly submitted job as pending.
    pub async fn insert_pending(&self, id: JobId, kind: JobKind) -> JobRecord {
        let record = JobRecord::pending(id, kind, Utc::now());
        let mut records = self.records.write().await;
        records.insert(id, record.clone());
        self.publish(&record);
        record
    }

    /// Drop a record that is still pending (its submission was rolled back).
    /// Records in any other state are left alone.
    pub async fn discard_pending(&self, id: JobId) -> bool {
        let mut records = self.records.write().await;
        match records.get(&id) {
            Some(record) if record.state() == &JobState::Pending => {
                records.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Check-and-set `pending -> running`. `false` means the job is unknown
    /// or was already claimed, and must not be executed.
    pub async fn mark_running(&self, id: JobId) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return false;
        };
        if !record.start(Utc::now()) {
            return false;
        }
        self.publish(record);
        true
    }

    /// Write the terminal state. `false` means the job was not running.
    pub async fn complete(&self, id: JobId, outcome: Result<JobOutput, JobFailure>) -> bool {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return false;
        };
        if !record.finish(outcome, Utc::now()) {
            return false;
        }
        self.publish(record);
        true
    }

    pub async fn get(&self, id: JobId) -> Option<JobRecord> {
        self.records.read().await.get(&id).cloned()
    }

    pub async fn resolve(&self, id: JobId) -> Resolution {
        let records = self.records.read().await;
        Resolution::from_record(records.get(&id))
    }

    /// Remove terminal records completed at least `ttl` ago. Pending and
    /// running records are never evicted.
    pub async fn evict_expired(&self, ttl: Duration) -> usize {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return 0;
        };
        let cutoff = Utc::now() - ttl;

        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, record| match record.completed_at {
            Some(completed_at) => completed_at > cutoff,
            None => true,
        });
        before - records.len()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn publish(&self, record: &JobRecord) {
        self.events
            .publish(JobEvent::new(record.id, record.kind, record.status()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
