//! Submission and polling facade.
//!
//! [`JobClient::submit`] records the job as pending and enqueues it, then
//! returns the id at once. [`JobClient::try_resolve`] is a single read of the
//! result store. Neither ever waits on a worker.

use std::sync::Arc;

use jobline_core::error::CoreError;
use jobline_core::job::{JobKind, JobOutput, JobRecord, Resolution};
use jobline_core::types::JobId;
use uuid::Uuid;

use crate::queue::{JobQueue, QueuedJob};
use crate::store::ResultStore;

/// Result of [`JobClient::submit_and_peek`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The job had already succeeded when we looked.
    Ready(JobOutput),
    /// Not done yet (or failed); poll with this handle.
    Handle(JobId),
}

#[derive(Clone)]
pub struct JobClient {
    queue: Arc<JobQueue>,
    store: Arc<ResultStore>,
}

impl JobClient {
    pub fn new(queue: Arc<JobQueue>, store: Arc<ResultStore>) -> Self {
        Self { queue, store }
    }

    /// Submit a job and return its handle without waiting for it to run.
    ///
    /// If the queue refuses the job the pending record is removed again, so
    /// a rejected submission leaves nothing behind to poll.
    pub async fn submit(&self, kind: JobKind) -> Result<JobId, CoreError> {
        let id = Uuid::new_v4();
        self.store.insert_pending(id, kind).await;

        if let Err(e) = self.queue.enqueue(QueuedJob { id, kind }) {
            self.store.discard_pending(id).await;
            tracing::warn!(job_id = %id, kind = %kind, error = %e, "Job submission rejected");
            return Err(e);
        }

        tracing::info!(job_id = %id, kind = %kind, "Job submitted");
        Ok(id)
    }

    /// Look at the job once. Running jobs resolve as pending.
    pub async fn try_resolve(&self, id: JobId) -> Resolution {
        self.store.resolve(id).await
    }

    /// Submit, then look once. Only a result that already exists at that
    /// instant is returned; otherwise the caller gets the handle to poll.
    pub async fn submit_and_peek(&self, kind: JobKind) -> Result<Submission, CoreError> {
        let id = self.submit(kind).await?;
        Ok(self.peek(id).await)
    }

    /// The inline result if `id` has already succeeded, else its handle.
    pub async fn peek(&self, id: JobId) -> Submission {
        match self.try_resolve(id).await {
            Resolution::Succeeded(output) => Submission::Ready(output),
            _ => Submission::Handle(id),
        }
    }

    /// Full record for status views.
    pub async fn record(&self, id: JobId) -> Option<JobRecord> {
        self.store.get(id).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
