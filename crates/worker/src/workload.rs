//! What each [`JobKind`] actually does.

use std::sync::Arc;
use std::time::Duration;

use jobline_core::error::CoreError;
use jobline_core::job::{JobKind, JobOutput};
use jobline_core::questions::QuestionCounter;

/// Everything the workloads need, built once and shared by every worker.
#[derive(Clone)]
pub struct Workloads {
    questions: Arc<dyn QuestionCounter>,
    query_delay: Duration,
}

impl Workloads {
    pub fn new(questions: Arc<dyn QuestionCounter>, query_delay: Duration) -> Self {
        Self {
            questions,
            query_delay,
        }
    }

    pub async fn execute(&self, kind: JobKind) -> Result<JobOutput, CoreError> {
        match kind {
            JobKind::CountQuestions => {
                tokio::time::sleep(self.query_delay).await;
                let count = self.questions.count_questions().await?;
                Ok(JobOutput::Count(count))
            }
            JobKind::Heartbeat => Ok(JobOutput::Empty),
        }
    }
}
