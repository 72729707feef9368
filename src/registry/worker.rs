//! Task worker
//!
//! One worker per task. It waits for a concurrency permit, marks the task
//! `running`, streams the remote response through the extractor under a
//! timeout and records the terminal outcome. The work runs in its own tokio
//! task so that a panic is caught by the supervising task and recorded as a
//! failure instead of disappearing with the record stuck in `running`.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::domain::{DocumentPair, Payload, TaskFailure, TaskState};
use crate::registry::TaskRegistry;
use crate::remote::GenerationSource;
use crate::stream::extract_channel;

/// Spawn the supervised worker for task `id`
pub(crate) fn spawn(registry: TaskRegistry, id: String, documents: DocumentPair) -> JoinHandle<()> {
    tokio::spawn(supervise(registry, id, documents))
}

async fn supervise(registry: TaskRegistry, id: String, documents: DocumentPair) {
    let execution = tokio::spawn(execute(registry.clone(), id.clone(), documents));

    if let Err(e) = execution.await {
        let detail = if e.is_panic() {
            "worker panicked".to_string()
        } else {
            format!("worker aborted: {}", e)
        };
        tracing::error!(task_id = %id, %detail, "Task worker crashed");
        registry
            .apply(&id, TaskState::failed(TaskFailure::WorkerCrashed(detail)))
            .await;
    }
}

async fn execute(registry: TaskRegistry, id: String, documents: DocumentPair) {
    let _permit = match registry.acquire_permit().await {
        Ok(permit) => permit,
        Err(_) => {
            let failure = TaskFailure::WorkerCrashed("worker pool closed".to_string());
            registry.apply(&id, TaskState::failed(failure)).await;
            return;
        }
    };

    if !registry.apply(&id, TaskState::Running).await {
        tracing::debug!(task_id = %id, "Task gone before start, skipping remote call");
        return;
    }
    tracing::info!(task_id = %id, "Task running");

    let config = registry.config();
    let outcome = run_remote(
        registry.source(),
        &documents,
        &config.target_label,
        config.remote_timeout,
    )
    .await;

    let next = match outcome {
        Ok(payload) => {
            tracing::info!(task_id = %id, "Task completed");
            TaskState::Completed { payload }
        }
        Err(failure) => {
            tracing::warn!(task_id = %id, kind = ?failure.kind(), %failure, "Task failed");
            TaskState::failed(failure)
        }
    };
    registry.apply(&id, next).await;
}

/// One bounded remote call: open, extract the target channel, validate as JSON
///
/// The payload keeps the channel text verbatim.
pub async fn run_remote(
    source: &dyn GenerationSource,
    documents: &DocumentPair,
    target_label: &str,
    timeout: Duration,
) -> Result<Payload, TaskFailure> {
    let call = async {
        let lines = source.open(documents).await?;
        extract_channel(lines, target_label).await
    };

    let text = tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| TaskFailure::Timeout(timeout))??;

    Payload::parse(text).map_err(|e| TaskFailure::MalformedPayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MockBehavior, MockSource};
    use crate::stream::StreamEvent;

    fn documents() -> DocumentPair {
        DocumentPair::new("https://example.com/cv.pdf", "https://example.com/report.pdf")
    }

    const LABEL: &str = "data_with_index";

    #[tokio::test]
    async fn test_run_remote_parses_payload() {
        let source = MockSource::with_events(&[
            StreamEvent::marker(LABEL),
            StreamEvent::fragment("[1,"),
            StreamEvent::fragment("2]"),
        ]);
        let payload = run_remote(&source, &documents(), LABEL, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(payload.as_str(), "[1,2]");
    }

    #[tokio::test]
    async fn test_run_remote_propagates_remote_failure() {
        let failure = TaskFailure::RemoteCallFailed {
            status: Some(503),
            detail: "unavailable".into(),
        };
        let source = MockSource::failing(failure.clone());
        let result = run_remote(&source, &documents(), LABEL, Duration::from_secs(1)).await;
        assert_eq!(result, Err(failure));
    }

    #[tokio::test]
    async fn test_run_remote_times_out() {
        let source = MockSource::hanging();
        let timeout = Duration::from_millis(20);
        let result = run_remote(&source, &documents(), LABEL, timeout).await;
        assert_eq!(result, Err(TaskFailure::Timeout(timeout)));
    }

    #[tokio::test]
    async fn test_run_remote_no_output() {
        let source = MockSource::with_events(&[StreamEvent::marker(LABEL)]);
        let result = run_remote(&source, &documents(), LABEL, Duration::from_secs(1)).await;
        assert_eq!(result, Err(TaskFailure::NoOutputProduced));
    }

    #[tokio::test]
    async fn test_run_remote_incomplete_stream() {
        let source = MockSource::new(MockBehavior::BreakAfter(
            vec![
                StreamEvent::marker(LABEL).to_line(),
                StreamEvent::fragment("{}").to_line(),
            ],
            "connection reset by peer".into(),
        ));
        let result = run_remote(&source, &documents(), LABEL, Duration::from_secs(1)).await;
        assert_eq!(
            result,
            Err(TaskFailure::IncompleteStream("connection reset by peer".into()))
        );
    }
}
