//! Task lifecycle integration tests
//!
//! Drives the registry end to end with scripted generation sources.

use std::sync::Arc;
use std::time::Duration;

use cvagent::domain::{DocumentPair, FailureKind, TaskRecord, TaskState, TaskStatus, TaskFailure};
use cvagent::error::CvAgentError;
use cvagent::registry::{RegistryConfig, RetentionPolicy, TaskRegistry};
use cvagent::remote::{MockBehavior, MockSource};
use cvagent::stream::StreamEvent;

const LABEL: &str = "data_with_index";

fn documents() -> DocumentPair {
    DocumentPair::new("https://example.com/cv.pdf", "https://example.com/report.pdf")
}

fn registry_with(source: Arc<MockSource>, config: RegistryConfig) -> TaskRegistry {
    TaskRegistry::new(source, config)
}

fn registry(source: MockSource) -> TaskRegistry {
    registry_with(Arc::new(source), RegistryConfig::default())
}

async fn wait_for_terminal(registry: &TaskRegistry, id: &str) -> TaskRecord {
    for _ in 0..300 {
        let record = registry.get_status(id).await.expect("task should exist");
        if record.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} never reached a terminal state", id);
}

async fn wait_for_status(registry: &TaskRegistry, id: &str, status: TaskStatus) {
    for _ in 0..300 {
        if registry.get_status(id).await.map(|r| r.status()).ok() == Some(status) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {} never reached {:?}", id, status);
}

fn failure_kind(record: &TaskRecord) -> FailureKind {
    match &record.state {
        TaskState::Failed { error } => error.kind,
        other => panic!("expected failed, got {:?}", other),
    }
}

/// Interleaved channels: only the target channel's fragments are kept
#[tokio::test]
async fn test_interleaved_channels_extract_target_only() {
    let registry = registry(MockSource::with_events(&[
        StreamEvent::marker("other"),
        StreamEvent::fragment("x"),
        StreamEvent::marker(LABEL),
        StreamEvent::fragment("\"a"),
        StreamEvent::marker("other"),
        StreamEvent::fragment("y"),
        StreamEvent::marker(LABEL),
        StreamEvent::fragment("b\""),
    ]));
    let id = registry.create(documents()).await.unwrap();

    let record = wait_for_terminal(&registry, &id).await;
    assert_eq!(completed_text(&record), "\"ab\"");
}

fn completed_text(record: &TaskRecord) -> String {
    match &record.state {
        TaskState::Completed { payload } => serde_json::to_string(payload).unwrap(),
        other => panic!("expected completed, got {:?}", other),
    }
}

async fn complete_with_fragments(fragments: &[&str]) -> TaskRecord {
    let mut events = vec![StreamEvent::marker(LABEL)];
    events.extend(fragments.iter().map(|f| StreamEvent::fragment(*f)));
    let registry = registry(MockSource::with_events(&events));
    let id = registry.create(documents()).await.unwrap();
    wait_for_terminal(&registry, &id).await
}

#[tokio::test]
async fn test_payload_reserializes_to_fragment_concatenation() {
    let fragments = ["{\"name\":\"Ada\",", "\"age\":36,", "\"experience\":[]}"];
    let record = complete_with_fragments(&fragments).await;
    assert_eq!(completed_text(&record), fragments.concat());
}

#[tokio::test]
async fn test_payload_keeps_formatting_of_fragments() {
    let fragments = ["{\"name\": \"Ada\", ", "\"skills\": [\"math\", ", "\"engines\"]}"];
    let record = complete_with_fragments(&fragments).await;
    assert_eq!(completed_text(&record), fragments.concat());

    // Status responses carry the same bytes
    let body = serde_json::to_string(&record).unwrap();
    assert!(body.contains(&format!("\"payload\":{}", fragments.concat())));
}

#[tokio::test]
async fn test_invalid_utf8_fragment_line_is_skipped() {
    let mut corrupt = StreamEvent::fragment("\"x").to_line().into_bytes();
    let at = corrupt.len() - 3;
    corrupt.insert(at, 0xff);

    let lines = vec![
        StreamEvent::marker(LABEL).to_line().into_bytes(),
        StreamEvent::fragment("\"a").to_line().into_bytes(),
        corrupt,
        StreamEvent::fragment("b\"").to_line().into_bytes(),
    ];
    let registry = registry(MockSource::new(MockBehavior::Bytes(lines)));
    let id = registry.create(documents()).await.unwrap();

    let record = wait_for_terminal(&registry, &id).await;
    assert_eq!(completed_text(&record), "\"ab\"");
}

#[tokio::test]
async fn test_remote_rejection_fails_task() {
    let registry = registry(MockSource::failing(TaskFailure::RemoteCallFailed {
        status: Some(500),
        detail: "internal error".into(),
    }));
    let id = registry.create(documents()).await.unwrap();

    let record = wait_for_terminal(&registry, &id).await;
    assert_eq!(failure_kind(&record), FailureKind::RemoteCallFailed);
}

#[tokio::test]
async fn test_marker_without_fragments_fails_with_no_output() {
    let registry = registry(MockSource::with_events(&[
        StreamEvent::marker(LABEL),
        StreamEvent::marker("other"),
        StreamEvent::fragment("ignored"),
    ]));
    let id = registry.create(documents()).await.unwrap();

    let record = wait_for_terminal(&registry, &id).await;
    assert_eq!(failure_kind(&record), FailureKind::NoOutputProduced);
}

#[tokio::test]
async fn test_quick_creates_get_distinct_ids() {
    let registry = registry(MockSource::with_events(&[
        StreamEvent::marker(LABEL),
        StreamEvent::fragment("{}"),
    ]));
    let first = registry.create(documents()).await.unwrap();
    let second = registry
        .create(DocumentPair::new(
            "https://example.com/other-cv.pdf",
            "https://example.com/report.pdf",
        ))
        .await
        .unwrap();
    assert_ne!(first, second);

    let a = wait_for_terminal(&registry, &first).await;
    let b = wait_for_terminal(&registry, &second).await;
    assert_eq!(a.documents, documents());
    assert_eq!(b.documents.cv_url, "https://example.com/other-cv.pdf");
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn test_timeout_fails_task() {
    let config = RegistryConfig {
        remote_timeout: Duration::from_millis(50),
        ..RegistryConfig::default()
    };
    let registry = registry_with(Arc::new(MockSource::hanging()), config);
    let id = registry.create(documents()).await.unwrap();

    let record = wait_for_terminal(&registry, &id).await;
    assert_eq!(failure_kind(&record), FailureKind::Timeout);
}

#[tokio::test]
async fn test_broken_stream_fails_as_incomplete() {
    let registry = registry(MockSource::new(MockBehavior::BreakAfter(
        vec![
            StreamEvent::marker(LABEL).to_line(),
            StreamEvent::fragment("{\"partial\":").to_line(),
        ],
        "connection reset".into(),
    )));
    let id = registry.create(documents()).await.unwrap();

    let record = wait_for_terminal(&registry, &id).await;
    assert_eq!(failure_kind(&record), FailureKind::IncompleteStream);
}

#[tokio::test]
async fn test_worker_panic_is_recorded_as_crash() {
    let registry = registry(MockSource::new(MockBehavior::Panic));
    let id = registry.create(documents()).await.unwrap();

    let record = wait_for_terminal(&registry, &id).await;
    assert_eq!(failure_kind(&record), FailureKind::WorkerCrashed);
}

#[tokio::test]
async fn test_concurrency_limit_queues_excess_tasks() {
    let source = Arc::new(
        MockSource::with_events(&[StreamEvent::marker(LABEL), StreamEvent::fragment("1")])
            .with_delay(Duration::from_millis(50)),
    );
    let config = RegistryConfig {
        max_concurrent: 2,
        ..RegistryConfig::default()
    };
    let registry = registry_with(source.clone(), config);

    let mut ids = Vec::new();
    for _ in 0..6 {
        ids.push(registry.create(documents()).await.unwrap());
    }
    for id in &ids {
        let record = wait_for_terminal(&registry, id).await;
        assert_eq!(record.status(), TaskStatus::Completed);
    }

    assert_eq!(source.calls(), 6);
    assert!(source.max_in_flight() <= 2);
}

#[tokio::test]
async fn test_pending_queries_are_idempotent() {
    let registry = registry(MockSource::hanging());
    let id = registry.create(documents()).await.unwrap();
    wait_for_status(&registry, &id, TaskStatus::Running).await;

    let first = registry.get_status(&id).await.unwrap();
    let second = registry.get_status(&id).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_terminal_record_retained_for_grace_period() {
    let registry = registry(MockSource::with_events(&[
        StreamEvent::marker(LABEL),
        StreamEvent::fragment("true"),
    ]));
    let id = registry.create(documents()).await.unwrap();
    let record = wait_for_terminal(&registry, &id).await;

    // Read does not consume the record
    assert!(registry.get_status(&id).await.is_ok());

    let grace = 10 * 60 * 1000;
    assert_eq!(registry.sweep_at(record.updated_at + grace).await, 0);
    assert!(registry.get_status(&id).await.is_ok());

    assert_eq!(registry.sweep_at(record.updated_at + grace + 1).await, 1);
    assert!(matches!(
        registry.get_status(&id).await,
        Err(CvAgentError::TaskNotFound(_))
    ));
}

#[tokio::test]
async fn test_expired_record_is_not_returned_before_sweep() {
    let config = RegistryConfig {
        retention: RetentionPolicy::new(Duration::from_millis(200), Duration::from_millis(20))
            .unwrap(),
        ..RegistryConfig::default()
    };
    let source = Arc::new(MockSource::with_events(&[
        StreamEvent::marker(LABEL),
        StreamEvent::fragment("1"),
    ]));
    let registry = registry_with(source, config);
    let id = registry.create(documents()).await.unwrap();
    wait_for_terminal(&registry, &id).await;

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(matches!(
        registry.get_status(&id).await,
        Err(CvAgentError::TaskNotFound(_))
    ));
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn test_update_after_eviction_is_discarded() {
    let source = Arc::new(
        MockSource::with_events(&[StreamEvent::marker(LABEL), StreamEvent::fragment("{}")])
            .with_delay(Duration::from_millis(150)),
    );
    let registry = registry_with(source.clone(), RegistryConfig::default());
    let id = registry.create(documents()).await.unwrap();
    wait_for_status(&registry, &id, TaskStatus::Running).await;

    let far_future = cvagent::id::now_ms() + 2 * 60 * 60 * 1000;
    assert_eq!(registry.sweep_at(far_future).await, 1);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(source.calls(), 1);
    assert!(registry.is_empty().await);
    assert!(matches!(
        registry.get_status(&id).await,
        Err(CvAgentError::TaskNotFound(_))
    ));
}
