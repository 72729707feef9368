//! The seam between the task registry and whatever produces event streams.

use async_trait::async_trait;

use crate::domain::{DocumentPair, TaskFailure};
use crate::stream::LineStream;

/// A streaming source of tagged events
///
/// `open` resolves once the remote has accepted the request and started
/// streaming; a non-success status must be reported as
/// [`TaskFailure::RemoteCallFailed`] at this point, before any line is read.
#[async_trait]
pub trait GenerationSource: Send + Sync {
    async fn open(&self, documents: &DocumentPair) -> Result<LineStream, TaskFailure>;
}
