//! Fixed-size pool of worker tasks draining the [`JobQueue`].
//!
//! Each worker loops: claim a job, mark it running, execute it on its own
//! task, store the terminal state. The workload runs inside `tokio::spawn`
//! so a panic surfaces as a `JoinError` at the loop boundary and is stored as
//! a failed job; the worker itself keeps going.

use std::sync::Arc;
use std::time::Duration;

use jobline_core::job::{JobFailure, JobOutput};
use tokio::task::{JoinError, JoinHandle};

use crate::queue::{JobQueue, QueuedJob};
use crate::store::ResultStore;
use crate::workload::Workloads;

pub struct WorkerPool {
    queue: Arc<JobQueue>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers (minimum 1) on the current runtime.
    pub fn start(
        size: usize,
        queue: Arc<JobQueue>,
        store: Arc<ResultStore>,
        workloads: Workloads,
    ) -> Self {
        let size = size.max(1);
        let handles = (0..size)
            .map(|worker_id| {
                tokio::spawn(run_worker(
                    worker_id,
                    Arc::clone(&queue),
                    Arc::clone(&store),
                    workloads.clone(),
                ))
            })
            .collect();

        tracing::info!(workers = size, "Worker pool started");
        Self { queue, handles }
    }

    /// Close the queue and wait up to `timeout` for the workers to drain it.
    ///
    /// Returns `true` if every worker stopped in time. Workers still busy at
    /// the deadline are aborted.
    pub async fn shutdown(self, timeout: Duration) -> bool {
        self.queue.close();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut clean = true;

        for handle in self.handles {
            let abort = handle.abort_handle();
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Worker task ended abnormally");
                    clean = false;
                }
                Err(_) => {
                    abort.abort();
                    clean = false;
                }
            }
        }

        if clean {
            tracing::info!("Worker pool stopped");
        } else {
            tracing::warn!("Worker pool did not stop cleanly before the deadline");
        }
        clean
    }
}

async fn run_worker(
    worker_id: usize,
    queue: Arc<JobQueue>,
    store: Arc<ResultStore>,
    workloads: Workloads,
) {
    tracing::debug!(worker_id, "Worker started");
    while let Some(job) = queue.claim().await {
        process(worker_id, job, &store, &workloads).await;
    }
    tracing::debug!(worker_id, "Worker stopped, queue closed");
}

async fn process(worker_id: usize, job: QueuedJob, store: &ResultStore, workloads: &Workloads) {
    if !store.mark_running(job.id).await {
        tracing::warn!(
            job_id = %job.id,
            worker_id,
            "Job is not pending, skipping",
        );
        return;
    }

    tracing::info!(job_id = %job.id, kind = %job.kind, worker_id, "Job claimed by worker");

    let workloads = workloads.clone();
    let execution = tokio::spawn(async move { workloads.execute(job.kind).await });

    let outcome: Result<JobOutput, JobFailure> = match execution.await {
        Ok(Ok(output)) => {
            tracing::info!(job_id = %job.id, kind = %job.kind, "Job succeeded");
            Ok(output)
        }
        Ok(Err(e)) => {
            tracing::warn!(job_id = %job.id, kind = %job.kind, error = %e, "Job failed");
            Err(JobFailure::error(e.to_string()))
        }
        Err(e) => {
            let message = panic_message(e);
            tracing::error!(job_id = %job.id, kind = %job.kind, error = %message, "Job panicked");
            Err(JobFailure::panic(message))
        }
    };

    if !store.complete(job.id, outcome).await {
        tracing::error!(job_id = %job.id, "Terminal state rejected by result store");
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => {
            if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            }
        }
        Err(e) => e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use jobline_core::error::CoreError;
    use jobline_core::job::{FailureKind, JobKind, JobStatus, Resolution};
    use jobline_core::questions::QuestionCounter;
    use jobline_events::EventBus;
    use uuid::Uuid;

    use super::*;

    struct Fixed(i64);

    #[async_trait::async_trait]
    impl QuestionCounter for Fixed {
        async fn count_questions(&self) -> Result<i64, CoreError> {
            Ok(self.0)
        }
    }

    struct Panicking;

    #[async_trait::async_trait]
    impl QuestionCounter for Panicking {
        async fn count_questions(&self) -> Result<i64, CoreError> {
            panic!("database exploded")
        }
    }

    fn store() -> Arc<ResultStore> {
        Arc::new(ResultStore::new(Arc::new(EventBus::default())))
    }

    async fn enqueue(store: &ResultStore, queue: &JobQueue, kind: JobKind) -> Uuid {
        let id = Uuid::new_v4();
        store.insert_pending(id, kind).await;
        queue.enqueue(QueuedJob { id, kind }).unwrap();
        id
    }

    #[tokio::test]
    async fn panicking_job_fails_without_killing_worker() {
        let store = store();
        let queue = Arc::new(JobQueue::new(8));
        let workloads = Workloads::new(Arc::new(Panicking), Duration::ZERO);
        let pool = WorkerPool::start(1, Arc::clone(&queue), Arc::clone(&store), workloads);

        let bad = enqueue(&store, &queue, JobKind::CountQuestions).await;
        let good = enqueue(&store, &queue, JobKind::Heartbeat).await;

        assert!(pool.shutdown(Duration::from_secs(5)).await);

        let failure = match store.resolve(bad).await {
            Resolution::Failed(failure) => failure,
            other => panic!("expected failure, got {other:?}"),
        };
        assert_eq!(failure.kind, FailureKind::Panic);
        assert!(failure.message.contains("database exploded"));

        // The same single worker went on to run the next job.
        assert_eq!(
            store.resolve(good).await,
            Resolution::Succeeded(JobOutput::Empty)
        );
    }

    #[tokio::test]
    async fn already_claimed_job_is_not_run_twice() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let store = Arc::new(ResultStore::new(Arc::clone(&bus)));
        let queue = Arc::new(JobQueue::new(8));

        let id = Uuid::new_v4();
        store.insert_pending(id, JobKind::Heartbeat).await;
        // The same entry delivered twice.
        let entry = QueuedJob {
            id,
            kind: JobKind::Heartbeat,
        };
        queue.enqueue(entry).unwrap();
        queue.enqueue(entry).unwrap();

        let workloads = Workloads::new(Arc::new(Fixed(1)), Duration::ZERO);
        let pool = WorkerPool::start(2, Arc::clone(&queue), Arc::clone(&store), workloads);
        assert!(pool.shutdown(Duration::from_secs(5)).await);

        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            statuses.push(event.status);
        }
        assert_eq!(
            statuses,
            vec![JobStatus::Pending, JobStatus::Running, JobStatus::Succeeded]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_times_out_on_slow_job() {
        let store = store();
        let queue = Arc::new(JobQueue::new(8));
        let workloads = Workloads::new(Arc::new(Fixed(1)), Duration::from_secs(600));
        let pool = WorkerPool::start(1, Arc::clone(&queue), Arc::clone(&store), workloads);

        let id = enqueue(&store, &queue, JobKind::CountQuestions).await;
        tokio::task::yield_now().await;

        assert!(!pool.shutdown(Duration::from_secs(1)).await);
        assert_eq!(store.resolve(id).await, Resolution::Pending);
    }
}
