use std::sync::Arc;

use jobline_core::staging::FileStager;
use jobline_worker::JobClient;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Job submission and polling.
    pub jobs: JobClient,
    /// Writes download artifacts into the shared staging directory.
    pub stager: FileStager,
}
