//! Scripted [`GenerationSource`] for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};

use crate::domain::{DocumentPair, TaskFailure};
use crate::remote::source::GenerationSource;
use crate::stream::{LineStream, RawLine, StreamError, StreamEvent, lines_from_vec};

/// What the mock does when opened
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Stream these lines, then close cleanly
    Lines(Vec<String>),
    /// Stream these raw lines (not necessarily UTF-8), then close cleanly
    Bytes(Vec<RawLine>),
    /// Refuse before streaming
    Fail(TaskFailure),
    /// Stream these lines, then drop the connection with this error
    BreakAfter(Vec<String>, String),
    /// Never resolve
    Hang,
    /// Panic inside `open`
    Panic,
}

/// Mock source with a fixed behavior and call accounting
#[derive(Debug)]
pub struct MockSource {
    behavior: MockBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<DocumentPair>>,
}

impl MockSource {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Stream the given events in wire format
    pub fn with_events(events: &[StreamEvent]) -> Self {
        Self::new(MockBehavior::Lines(
            events.iter().map(StreamEvent::to_line).collect(),
        ))
    }

    pub fn failing(failure: TaskFailure) -> Self {
        Self::new(MockBehavior::Fail(failure))
    }

    pub fn hanging() -> Self {
        Self::new(MockBehavior::Hang)
    }

    /// Sleep this long inside `open` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `open` calls that were in progress at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DocumentPair> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerationSource for MockSource {
    async fn open(&self, documents: &DocumentPair) -> Result<LineStream, TaskFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(documents.clone());
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Lines(lines) => Ok(lines_from_vec(lines.clone())),
            MockBehavior::Bytes(lines) => {
                Ok(stream::iter(lines.clone().into_iter().map(Ok)).boxed())
            }
            MockBehavior::Fail(failure) => Err(failure.clone()),
            MockBehavior::BreakAfter(lines, error) => {
                let items = lines
                    .iter()
                    .map(|line| Ok(line.clone().into_bytes()))
                    .chain(std::iter::once(Err(StreamError(error.clone()))));
                Ok(stream::iter(items.collect::<Vec<_>>()).boxed())
            }
            MockBehavior::Hang => std::future::pending().await,
            MockBehavior::Panic => panic!("mock source panicked"),
        }
    }
}
