//! Job lifecycle model.
//!
//! A [`JobRecord`] moves through `pending -> running -> succeeded | failed`.
//! The result and the failure live inside the terminal [`JobState`] variants,
//! so a record cannot carry a result without having succeeded or an error
//! without having failed. The transition methods refuse anything that would
//! skip `running` or leave a terminal state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Job kinds
// ---------------------------------------------------------------------------

/// The closed set of work a worker knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Wait for the configured delay, then count the rows of `questions`.
    CountQuestions,
    /// Recurring no-op; triggered externally on a schedule.
    Heartbeat,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::CountQuestions => "count_questions",
            JobKind::Heartbeat => "heartbeat",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Status / outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload produced by a successful job.
///
/// Serializes untagged: a count renders as a number, `Empty` as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    Count(i64),
    Empty,
}

impl JobOutput {
    pub fn as_count(&self) -> Option<i64> {
        match self {
            JobOutput::Count(n) => Some(*n),
            JobOutput::Empty => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The workload returned an error.
    Error,
    /// The workload panicked.
    Panic,
}

/// Captured description of a failed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Error,
            message: message.into(),
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Panic,
            message: message.into(),
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Error => write!(f, "{}", self.message),
            FailureKind::Panic => write!(f, "job panicked: {}", self.message),
        }
    }
}

// ---------------------------------------------------------------------------
// State / record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Running,
    Succeeded { result: JobOutput },
    Failed { error: JobFailure },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Pending => JobStatus::Pending,
            JobState::Running => JobStatus::Running,
            JobState::Succeeded { .. } => JobStatus::Succeeded,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    #[serde(flatten)]
    state: JobState,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl JobRecord {
    /// A freshly submitted job.
    pub fn pending(id: JobId, kind: JobKind, now: Timestamp) -> Self {
        Self {
            id,
            kind,
            state: JobState::Pending,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    /// `pending -> running`. Returns `false` (and changes nothing) from any
    /// other state, which is what keeps a job from executing twice.
    pub fn start(&mut self, now: Timestamp) -> bool {
        if self.state != JobState::Pending {
            return false;
        }
        self.state = JobState::Running;
        self.started_at = Some(now);
        true
    }

    /// `running -> succeeded | failed`. Returns `false` from any other state.
    pub fn finish(&mut self, outcome: Result<JobOutput, JobFailure>, now: Timestamp) -> bool {
        if self.state != JobState::Running {
            return false;
        }
        self.state = match outcome {
            Ok(result) => JobState::Succeeded { result },
            Err(error) => JobState::Failed { error },
        };
        self.completed_at = Some(now);
        true
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// What a poller learns from a single non-blocking look at a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Submitted but not finished (queued or running).
    Pending,
    Succeeded(JobOutput),
    Failed(JobFailure),
    /// Never submitted, or evicted after its TTL.
    NotFound,
}

impl Resolution {
    pub fn from_record(record: Option<&JobRecord>) -> Self {
        match record.map(JobRecord::state) {
            None => Resolution::NotFound,
            Some(JobState::Pending | JobState::Running) => Resolution::Pending,
            Some(JobState::Succeeded { result }) => Resolution::Succeeded(result.clone()),
            Some(JobState::Failed { error }) => Resolution::Failed(error.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
