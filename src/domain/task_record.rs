//! Task record and related types
//!
//! A TaskRecord tracks one remote generation request from submission to its
//! terminal state. Status and result data share one enum, so a record can
//! never carry a payload and a failure at the same time.

use crate::error::{CvAgentError, Result};
use crate::id::{generate_task_id, now_ms};
use crate::domain::failure::{FailureReason, TaskFailure};
use crate::domain::payload::Payload;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// The two documents submitted to the remote workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPair {
    pub cv_url: String,
    pub report_url: String,
}

impl DocumentPair {
    pub fn new(cv_url: impl Into<String>, report_url: impl Into<String>) -> Self {
        Self {
            cv_url: cv_url.into(),
            report_url: report_url.into(),
        }
    }

    /// Both locators must be absolute http(s) URLs
    pub fn validate(&self) -> Result<()> {
        validate_url("cv_url", &self.cv_url)?;
        validate_url("report_url", &self.report_url)
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| CvAgentError::InvalidInput(format!("{} is not a valid URL: {}", field, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(CvAgentError::InvalidInput(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}

/// Status of a task, without its result data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted, waiting for a worker slot
    Pending,
    /// Worker is talking to the remote service
    Running,
    /// Payload extracted and parsed
    Completed,
    /// Ended with a failure reason
    Failed,
}

impl TaskStatus {
    /// Returns true if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Status together with the data that is only valid in that status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Completed { payload: Payload },
    Failed { error: FailureReason },
}

impl TaskState {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskState::Pending => TaskStatus::Pending,
            TaskState::Running => TaskStatus::Running,
            TaskState::Completed { .. } => TaskStatus::Completed,
            TaskState::Failed { .. } => TaskStatus::Failed,
        }
    }

    pub fn failed(failure: TaskFailure) -> Self {
        TaskState::Failed {
            error: failure.into(),
        }
    }

    /// Whether the state machine allows moving from `self` to `next`
    ///
    /// `pending -> running -> {completed | failed}`; a pending task may also
    /// fail directly if its worker dies before reaching `running`.
    pub fn can_transition_to(&self, next: &TaskState) -> bool {
        matches!(
            (self.status(), next.status()),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Pending, TaskStatus::Failed)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        )
    }
}

/// One in-flight or completed unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "task_id")]
    pub id: String,

    #[serde(flatten)]
    pub state: TaskState,

    pub documents: DocumentPair,

    //=== Timestamps (ms since epoch) ===
    pub created_at: i64,
    pub updated_at: i64,
}

impl TaskRecord {
    /// Create a new pending record with a fresh id
    pub fn new(documents: DocumentPair) -> Self {
        Self::with_id(generate_task_id(), documents)
    }

    pub fn with_id(id: impl Into<String>, documents: DocumentPair) -> Self {
        let now = now_ms();
        Self {
            id: id.into(),
            state: TaskState::Pending,
            documents,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Apply a state transition, refreshing `updated_at`
    ///
    /// Returns false, leaving the record untouched, if the transition is not
    /// allowed from the current state.
    pub fn advance(&mut self, next: TaskState) -> bool {
        if !self.state.can_transition_to(&next) {
            return false;
        }
        self.state = next;
        self.touch();
        true
    }

    /// Update the updated_at timestamp, never moving it before created_at
    pub fn touch(&mut self) {
        self.updated_at = now_ms().max(self.created_at);
    }
}
