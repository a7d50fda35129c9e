//! Job execution: the result store, the job queue, the worker pool that
//! drains it, the submission/polling client and the retention loops.

pub mod client;
pub mod pool;
pub mod queue;
pub mod retention;
pub mod store;
pub mod workload;

pub use client::{JobClient, Submission};
pub use pool::WorkerPool;
pub use queue::{JobQueue, QueuedJob};
pub use store::ResultStore;
pub use workload::Workloads;
