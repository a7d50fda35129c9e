//! Domain types shared by every jobline crate: the job lifecycle model, the
//! error taxonomy, the question-count seam and file staging.

pub mod error;
pub mod job;
pub mod questions;
pub mod staging;
pub mod types;
