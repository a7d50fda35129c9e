//! Trace every job event.
//!
//! [`EventLogger`] is a long-lived background task. It exits once the
//! [`EventBus`](crate::bus::EventBus) and every sender clone are dropped.

use tokio::sync::broadcast;

use crate::bus::JobEvent;

pub struct EventLogger;

impl EventLogger {
    /// Run the logging loop until the channel closes. Returns the number of
    /// events logged.
    pub async fn run(mut receiver: broadcast::Receiver<JobEvent>) -> u64 {
        let mut logged = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    tracing::debug!(
                        job_id = %event.job_id,
                        kind = %event.kind,
                        status = %event.status,
                        at = %event.timestamp,
                        "Job transition",
                    );
                    logged += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event logger lagged, some events were not logged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, event logger shutting down");
                    break;
                }
            }
        }
        logged
    }
}

#[cfg(test)]
mod tests {
    use jobline_core::job::{JobKind, JobStatus};
    use uuid::Uuid;

    use super::*;
    use crate::bus::EventBus;

    #[tokio::test]
    async fn stops_when_bus_is_dropped() {
        let bus = EventBus::default();
        let rx = bus.subscribe();
        bus.publish(JobEvent::new(Uuid::new_v4(), JobKind::Heartbeat, JobStatus::Pending));
        bus.publish(JobEvent::new(Uuid::new_v4(), JobKind::Heartbeat, JobStatus::Running));
        drop(bus);

        assert_eq!(EventLogger::run(rx).await, 2);
    }
}
