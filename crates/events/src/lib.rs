//! Job event bus.
//!
//! - [`EventBus`] - in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`JobEvent`] - one accepted job state transition.
//! - [`EventLogger`] - background subscriber that traces every event.

pub mod bus;
pub mod logger;

pub use bus::{EventBus, JobEvent};
pub use logger::EventLogger;
