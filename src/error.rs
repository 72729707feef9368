//! Error types for cvagent
//!
//! Centralized error handling using thiserror. Task-level failures that end up
//! inside a task record live in [`crate::domain::TaskFailure`].

use thiserror::Error;

/// All error types that can be returned by the cvagent library
#[derive(Debug, Error)]
pub enum CvAgentError {
    /// Task absent from the registry (never created, or already evicted)
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Caller supplied input the registry refuses to schedule
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Inconsistent or unusable configuration
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP client construction or transport error
    #[error("Remote error: {0}")]
    Remote(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for cvagent operations
pub type Result<T> = std::result::Result<T, CvAgentError>;
