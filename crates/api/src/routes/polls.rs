//! Page-style routes, mounted at the root.

use axum::routing::get;
use axum::Router;

use crate::handlers::{download, polls};
use crate::state::AppState;

/// ```text
/// GET    /                    -> index
/// GET    /check/{task_id}     -> check
/// GET    /download            -> download
/// ```
///
/// The check and download routes also answer with a trailing slash.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(polls::index))
        .route("/check/{task_id}", get(polls::check))
        .route("/check/{task_id}/", get(polls::check))
        .route("/download", get(download::download))
        .route("/download/", get(download::download))
}
