//! Handlers for the `/jobs` resource.
//!
//! Lets external triggers (a cron entry hitting `POST /jobs` every five
//! minutes, say) submit any job kind, and exposes the full job record,
//! including the difference between pending and unknown.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use jobline_core::error::CoreError;
use jobline_core::job::{JobKind, JobRecord};
use jobline_core::types::JobId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitJob {
    pub kind: JobKind,
}

#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub task_id: JobId,
}

/// POST /jobs
///
/// Submit a job. Returns 202 with the task id; the job runs in the
/// background.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(input): Json<SubmitJob>,
) -> AppResult<impl IntoResponse> {
    let task_id = state.jobs.submit(input.kind).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: JobAccepted { task_id },
        }),
    ))
}

/// GET /jobs/{id}
///
/// Full job record, or 404 once the job is unknown or expired.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<DataResponse<JobRecord>>> {
    let job = state
        .jobs
        .record(job_id)
        .await
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Job",
                id: job_id.to_string(),
            })
        })?;
    Ok(Json(DataResponse { data: job }))
}
