//! Domain types for cvagent
//!
//! - TaskRecord: identity, state, submitted documents and timestamps of one task
//! - TaskState/TaskStatus: the `pending -> running -> completed|failed` machine
//! - TaskFailure: everything that can end a task in `failed`
//! - Payload: the verbatim JSON result of a completed task

pub mod failure;
pub mod payload;
pub mod task_record;

pub use failure::{FailureKind, FailureReason, TaskFailure};
pub use payload::Payload;
pub use task_record::{DocumentPair, TaskRecord, TaskState, TaskStatus};
