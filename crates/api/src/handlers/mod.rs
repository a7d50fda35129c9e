//! Request handlers. Each submodule maps one group of routes onto the job
//! client or the file stager and converts failures via [`AppError`](crate::error::AppError).

pub mod download;
pub mod jobs;
pub mod polls;
