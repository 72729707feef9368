//! Task failure taxonomy.
//!
//! Everything that can go wrong inside a worker is expressed as a
//! [`TaskFailure`] and stored on the record as a [`FailureReason`]; none of it
//! escapes the worker boundary.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Why a task ended in the `failed` state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFailure {
    /// Connection could not be established, or the remote answered with a
    /// non-success status before streaming began
    #[error("Remote call failed{}: {detail}", fmt_status(.status))]
    RemoteCallFailed { status: Option<u16>, detail: String },

    /// Connection dropped before the stream completed
    #[error("Incomplete stream: {0}")]
    IncompleteStream(String),

    /// Stream completed but the target channel yielded no text
    #[error("No output produced on the target channel")]
    NoOutputProduced,

    /// Assembled text is not valid JSON
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Remote call exceeded its time budget
    #[error("Remote call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Worker task panicked or was aborted
    #[error("Worker crashed: {0}")]
    WorkerCrashed(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" with status {}", s)).unwrap_or_default()
}

impl TaskFailure {
    /// Machine-readable classification of this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskFailure::RemoteCallFailed { .. } => FailureKind::RemoteCallFailed,
            TaskFailure::IncompleteStream(_) => FailureKind::IncompleteStream,
            TaskFailure::NoOutputProduced => FailureKind::NoOutputProduced,
            TaskFailure::MalformedPayload(_) => FailureKind::MalformedPayload,
            TaskFailure::Timeout(_) => FailureKind::Timeout,
            TaskFailure::WorkerCrashed(_) => FailureKind::WorkerCrashed,
        }
    }
}

/// Classification of a failure, as exposed to status pollers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RemoteCallFailed,
    IncompleteStream,
    NoOutputProduced,
    MalformedPayload,
    Timeout,
    WorkerCrashed,
}

/// Failure as stored on a task record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl From<TaskFailure> for FailureReason {
    fn from(failure: TaskFailure) -> Self {
        Self {
            kind: failure.kind(),
            message: failure.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_call_failed_with_status() {
        let failure = TaskFailure::RemoteCallFailed {
            status: Some(401),
            detail: "unauthorized".into(),
        };
        assert_eq!(failure.to_string(), "Remote call failed with status 401: unauthorized");
        assert_eq!(failure.kind(), FailureKind::RemoteCallFailed);
    }

    #[test]
    fn test_remote_call_failed_without_status() {
        let failure = TaskFailure::RemoteCallFailed {
            status: None,
            detail: "connection refused".into(),
        };
        assert_eq!(failure.to_string(), "Remote call failed: connection refused");
    }

    #[test]
    fn test_timeout_message() {
        let failure = TaskFailure::Timeout(Duration::from_secs(600));
        assert_eq!(failure.to_string(), "Remote call timed out after 600s");
        assert_eq!(failure.kind(), FailureKind::Timeout);
    }

    #[test]
    fn test_failure_reason_from_failure() {
        let reason = FailureReason::from(TaskFailure::NoOutputProduced);
        assert_eq!(reason.kind, FailureKind::NoOutputProduced);
        assert_eq!(reason.message, "No output produced on the target channel");
    }

    #[test]
    fn test_failure_kind_serialization() {
        let json = serde_json::to_string(&FailureKind::MalformedPayload).unwrap();
        assert_eq!(json, "\"malformed_payload\"");
        let kind: FailureKind = serde_json::from_str("\"incomplete_stream\"").unwrap();
        assert_eq!(kind, FailureKind::IncompleteStream);
    }
}
