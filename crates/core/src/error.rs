#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// The job queue refused the submission (full or shut down). Retryable.
    #[error("Job queue unavailable: {0}")]
    QueueUnavailable(String),

    /// Creating, writing or re-permissioning a staged file failed.
    #[error("Staging failed: {0}")]
    Staging(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
