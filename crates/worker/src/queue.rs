//! Bounded FIFO hand-off from submitters to workers.
//!
//! Backed by a `tokio::sync::mpsc` channel. The single receiver sits behind
//! a mutex so that every entry is handed to exactly one claiming worker.
//! `enqueue` never waits: a full or closed queue is reported as
//! [`CoreError::QueueUnavailable`].
//!
//! Closing is two-step. [`JobQueue::close`] cancels a token that wakes idle
//! claimers; the first claimer to see it closes the channel itself, so any
//! job accepted before that point is still drained and nothing is accepted
//! after it.

use jobline_core::error::CoreError;
use jobline_core::job::JobKind;
use jobline_core::types::JobId;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// A job waiting for a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: JobId,
    pub kind: JobKind,
}

pub struct JobQueue {
    sender: mpsc::Sender<QueuedJob>,
    receiver: Mutex<mpsc::Receiver<QueuedJob>>,
    closed: CancellationToken,
    capacity: usize,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` unclaimed jobs (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            closed: CancellationToken::new(),
            capacity,
        }
    }

    /// Hand a job to the queue without waiting.
    pub fn enqueue(&self, job: QueuedJob) -> Result<(), CoreError> {
        if self.is_closed() {
            return Err(CoreError::QueueUnavailable("queue is closed".into()));
        }
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => CoreError::QueueUnavailable(format!(
                "queue is full ({} jobs waiting)",
                self.capacity
            )),
            mpsc::error::TrySendError::Closed(_) => {
                CoreError::QueueUnavailable("queue is closed".into())
            }
        })
    }

    /// Wait for the next job.
    ///
    /// Returns `None` once the queue has been closed and every job enqueued
    /// before closing has been claimed.
    pub async fn claim(&self) -> Option<QueuedJob> {
        let mut receiver = self.receiver.lock().await;
        if !self.is_closed() {
            tokio::select! {
                biased;
                job = receiver.recv() => return job,
                _ = self.closed.cancelled() => {}
            }
        }
        // Buffered jobs are still returned; `None` once the buffer is empty.
        receiver.close();
        receiver.recv().await
    }

    /// Stop accepting jobs. Already queued jobs can still be claimed.
    pub fn close(&self) {
        self.closed.cancel();
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Number of jobs waiting to be claimed.
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use uuid::Uuid;

    use super::*;

    fn job() -> QueuedJob {
        QueuedJob {
            id: Uuid::new_v4(),
            kind: JobKind::Heartbeat,
        }
    }

    #[tokio::test]
    async fn claims_in_fifo_order() {
        let queue = JobQueue::new(8);
        let (a, b, c) = (job(), job(), job());
        queue.enqueue(a).unwrap();
        queue.enqueue(b).unwrap();
        queue.enqueue(c).unwrap();
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.claim().await, Some(a));
        assert_eq!(queue.claim().await, Some(b));
        assert_eq!(queue.claim().await, Some(c));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn full_queue_is_unavailable() {
        let queue = JobQueue::new(1);
        queue.enqueue(job()).unwrap();

        assert_matches!(queue.enqueue(job()), Err(CoreError::QueueUnavailable(_)));
    }

    #[tokio::test]
    async fn closed_queue_rejects_but_drains() {
        let queue = JobQueue::new(4);
        let queued = job();
        queue.enqueue(queued).unwrap();
        queue.close();

        assert_matches!(queue.enqueue(job()), Err(CoreError::QueueUnavailable(_)));
        assert_eq!(queue.claim().await, Some(queued));
        assert_eq!(queue.claim().await, None);
    }

    #[tokio::test]
    async fn nothing_is_accepted_once_drained() {
        let queue = JobQueue::new(4);
        let queued = job();
        queue.enqueue(queued).unwrap();
        queue.close();

        assert_eq!(queue.claim().await, Some(queued));
        assert_eq!(queue.claim().await, None);

        // A submitter that passed the closed check just before `close` must
        // still be turned away by the channel.
        assert_matches!(
            queue.sender.try_send(job()),
            Err(mpsc::error::TrySendError::Closed(_))
        );
    }

    #[tokio::test]
    async fn job_accepted_during_close_is_still_drained() {
        let queue = JobQueue::new(4);
        queue.close();
        let late = job();
        queue.sender.try_send(late).unwrap();

        assert_eq!(queue.claim().await, Some(late));
        assert_eq!(queue.claim().await, None);
    }

    #[tokio::test]
    async fn close_wakes_waiting_claimer() {
        let queue = Arc::new(JobQueue::new(4));
        let waiter = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.claim().await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.close();

        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn each_job_is_claimed_once() {
        let queue = Arc::new(JobQueue::new(64));
        let mut expected: Vec<_> = (0..32).map(|_| job()).collect();
        for j in &expected {
            queue.enqueue(*j).unwrap();
        }
        queue.close();

        let claimers: Vec<_> = (0..4)
            .map(|_| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let mut mine = Vec::new();
                    while let Some(j) = queue.claim().await {
                        mine.push(j);
                    }
                    mine
                })
            })
            .collect();

        let mut claimed = Vec::new();
        for handle in claimers {
            claimed.extend(handle.await.unwrap());
        }

        claimed.sort_by_key(|j| j.id);
        expected.sort_by_key(|j| j.id);
        assert_eq!(claimed, expected);
    }
}
