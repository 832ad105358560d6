use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload returned for ids the service does not know (or no longer knows).
pub const NOT_FOUND_MESSAGE: &str = "Result not found or expired";

/// Lifecycle of a submitted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Init,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Externally visible state of one submitted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub task_id: String,
    pub status: RunStatus,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunResult {
    pub fn new(task_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            task_id: task_id.into(),
            status: RunStatus::Init,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Failed payload for an unknown or expired id.
    pub fn not_found(task_id: impl Into<String>) -> Self {
        let mut run = Self::new(task_id);
        run.status = RunStatus::Failed;
        run.result = Some(Value::String(NOT_FOUND_MESSAGE.to_string()));
        run.error = Some(NOT_FOUND_MESSAGE.to_string());
        run
    }

    /// init -> running. Returns false if the run already moved on.
    pub fn mark_running(&mut self) -> bool {
        self.advance(RunStatus::Running)
    }

    pub fn complete(&mut self, result: Value) -> bool {
        if !self.advance(RunStatus::Completed) {
            return false;
        }
        self.result = Some(result);
        true
    }

    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if !self.advance(RunStatus::Failed) {
            return false;
        }
        let error = error.into();
        self.result = Some(Value::String(error.clone()));
        self.error = Some(error);
        true
    }

    // Status only ever moves forward and never leaves a terminal state.
    fn advance(&mut self, next: RunStatus) -> bool {
        if self.status.is_terminal() || next <= self.status {
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }
}
