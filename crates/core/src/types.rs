/// Jobs are keyed by random (v4) UUIDs so a handle doubles as a bearer token.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
