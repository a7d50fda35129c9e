//! Shared response envelope for the `/jobs` API.
//!
//! The page-style routes (`/`, `/check/{task_id}`) return bare context
//! objects; everything under `/jobs` is wrapped in `{ "data": ... }`.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
