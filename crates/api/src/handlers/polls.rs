//! Handlers for the page-style endpoints: `/` submits the question count
//! job, `/check/{task_id}` polls it.
//!
//! `/check` deliberately renders pending, running, unknown and expired jobs
//! all as `questions_count: null`. `/jobs/{id}` is the view that tells them
//! apart.

use axum::extract::{Path, State};
use axum::Json;
use jobline_core::job::{JobKind, Resolution};
use jobline_core::types::JobId;
use jobline_worker::Submission;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Context returned by `GET /`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum IndexContext {
    /// The count was already available when we looked.
    Resolved { questions_count: Option<i64> },
    /// Poll `/check/{task_id}` for the result.
    Submitted { task_id: JobId },
}

impl From<Submission> for IndexContext {
    fn from(submission: Submission) -> Self {
        match submission {
            Submission::Ready(output) => IndexContext::Resolved {
                questions_count: output.as_count(),
            },
            Submission::Handle(task_id) => IndexContext::Submitted { task_id },
        }
    }
}

/// Body returned by `GET /check/{task_id}`.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub questions_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /
///
/// Submit a question count and look once. Returns the count if it is
/// already there, otherwise the task id to poll.
pub async fn index(State(state): State<AppState>) -> AppResult<Json<IndexContext>> {
    let submission = state.jobs.submit_and_peek(JobKind::CountQuestions).await?;
    Ok(Json(submission.into()))
}

/// GET /check/{task_id}
///
/// Always 200. Ids that do not parse are treated like any other unknown id.
pub async fn check(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Json<CheckResponse> {
    let resolution = match task_id.parse::<JobId>() {
        Ok(id) => state.jobs.try_resolve(id).await,
        Err(_) => Resolution::NotFound,
    };

    let body = match resolution {
        Resolution::Succeeded(output) => CheckResponse {
            questions_count: output.as_count(),
            error: None,
        },
        Resolution::Failed(failure) => CheckResponse {
            questions_count: None,
            error: Some(failure.to_string()),
        },
        Resolution::Pending => CheckResponse {
            questions_count: None,
            error: None,
        },
        Resolution::NotFound => {
            tracing::debug!(task_id = %task_id, "Polled unknown or expired task");
            CheckResponse {
                questions_count: None,
                error: None,
            }
        }
    };
    Json(body)
}
