//! Periodic eviction of expired results and staged files.
//!
//! Both loops run until `cancel` is triggered and are intended to be spawned
//! via `tokio::spawn`. Errors are logged and the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use jobline_core::staging::FileStager;
use tokio_util::sync::CancellationToken;

use crate::store::ResultStore;

/// Longest pause between two sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shortest pause between two sweeps.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub fn sweep_interval(ttl: Duration) -> Duration {
    ttl.clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL)
}

/// Evict terminal results older than `ttl`.
pub async fn run_result_retention(store: Arc<ResultStore>, ttl: Duration, cancel: CancellationToken) {
    let period = sweep_interval(ttl);
    tracing::info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = period.as_secs(),
        "Result retention started"
    );

    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Result retention stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = store.evict_expired(ttl).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Result retention: evicted expired results");
                } else {
                    tracing::debug!("Result retention: nothing to evict");
                }
            }
        }
    }
}

/// Delete staged files older than `ttl`.
pub async fn run_staging_retention(stager: FileStager, ttl: Duration, cancel: CancellationToken) {
    let period = sweep_interval(ttl);
    tracing::info!(
        dir = %stager.dir().display(),
        ttl_secs = ttl.as_secs(),
        interval_secs = period.as_secs(),
        "Staging retention started"
    );

    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Staging retention stopping");
                break;
            }
            _ = interval.tick() => {
                match stager.sweep_older_than(ttl).await {
                    Ok(0) => tracing::debug!("Staging retention: nothing to delete"),
                    Ok(removed) => {
                        tracing::info!(removed, "Staging retention: deleted expired files");
                    }
                    Err(e) => tracing::error!(error = %e, "Staging retention: sweep failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use jobline_core::job::{JobKind, JobOutput, Resolution};
    use jobline_core::staging::DeliveryMode;
    use jobline_events::EventBus;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn interval_is_clamped() {
        assert_eq!(sweep_interval(Duration::ZERO), MIN_SWEEP_INTERVAL);
        assert_eq!(sweep_interval(Duration::from_secs(30)), Duration::from_secs(30));
        assert_eq!(sweep_interval(Duration::from_secs(86_400)), MAX_SWEEP_INTERVAL);
    }

    #[tokio::test]
    async fn result_retention_evicts_then_stops() {
        let store = Arc::new(ResultStore::new(Arc::new(EventBus::default())));
        let id = Uuid::new_v4();
        store.insert_pending(id, JobKind::Heartbeat).await;
        store.mark_running(id).await;
        store.complete(id, Ok(JobOutput::Empty)).await;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_result_retention(
            Arc::clone(&store),
            Duration::ZERO,
            cancel.clone(),
        ));

        // The first interval tick fires immediately.
        for _ in 0..100 {
            if store.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.resolve(id).await, Resolution::NotFound);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn staging_retention_deletes_old_files() {
        let root = tempfile::tempdir().unwrap();
        let stager = FileStager::new(root.path(), DeliveryMode::Direct);
        let staged = stager.stage(b"stale").await.unwrap();
        let path = staged.path().to_path_buf();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_staging_retention(stager, Duration::ZERO, cancel.clone()));

        for _ in 0..100 {
            if !path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!path.exists());

        cancel.cancel();
        handle.await.unwrap();
    }
}
