use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, IntoStaticStr};

/// The `result` of every failed job.
pub const FAILED_MARKER: &str = "failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Success,
    Failed,
}

/// The body that is posted back to the queue for each job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    pub result: Value,
    pub server_attrs: Map<String, Value>,
    pub status: JobStatus,
}

impl ResultPayload {
    pub fn success(result: Value, server_attrs: Map<String, Value>) -> Self {
        Self {
            result,
            server_attrs,
            status: JobStatus::Success,
        }
    }

    pub fn failed(server_attrs: Map<String, Value>) -> Self {
        Self {
            result: Value::String(FAILED_MARKER.to_owned()),
            server_attrs,
            status: JobStatus::Failed,
        }
    }
}

/// The lifecycle of a job inside the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum JobState {
    Received,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Received, JobState::Running | JobState::Failed)
                | (JobState::Running, JobState::Succeeded | JobState::Failed)
        )
    }
}

/// The states a job went through, starting with [`JobState::Received`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLifecycle {
    states: Vec<JobState>,
}

impl Default for JobLifecycle {
    fn default() -> Self {
        Self {
            states: vec![JobState::Received],
        }
    }
}

impl JobLifecycle {
    pub fn current(&self) -> JobState {
        self.states.last().copied().unwrap_or(JobState::Received)
    }

    /// Moves to `next`. Invalid transitions are ignored and reported as `false`.
    pub fn transition(&mut self, next: JobState) -> bool {
        if !self.current().can_transition_to(next) {
            tracing::warn!(from = %self.current(), to = %next, "ignored invalid job state transition");
            return false;
        }

        self.states.push(next);
        true
    }

    pub fn states(&self) -> &[JobState] {
        &self.states
    }
}
