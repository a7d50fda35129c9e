pub mod health;
pub mod jobs;
pub mod polls;

use axum::Router;

use crate::state::AppState;

/// Build the application route tree (health excluded).
///
/// ```text
/// /                       submit question count, peek once
/// /check/{task_id}        poll a question count
/// /download               staged file delivery
///
/// /jobs                   submit any job kind (POST)
/// /jobs/{id}              full job record
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .merge(polls::router())
        .nest("/jobs", jobs::router())
}
