//! Data access seam for the `count_questions` workload.
//!
//! The worker crate only knows this trait; the database crate implements it
//! against Postgres, and tests supply a fixed count.

use crate::error::CoreError;

#[async_trait::async_trait]
pub trait QuestionCounter: Send + Sync {
    /// Number of rows in the questions table.
    async fn count_questions(&self) -> Result<i64, CoreError>;
}
