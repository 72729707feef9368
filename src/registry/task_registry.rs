//! Task registry implementation
//!
//! TaskRegistry owns the id -> record map, creates tasks, hands each one to a
//! worker and answers status queries. All structural changes to the map go
//! through one `RwLock`; record fields are only written by the worker that
//! owns the id, and only while the id is still present.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, Semaphore, SemaphorePermit};

use crate::domain::{DocumentPair, TaskRecord, TaskState};
use crate::error::{CvAgentError, Result};
use crate::id::now_ms;
use crate::registry::retention::RetentionPolicy;
use crate::registry::worker;
use crate::remote::GenerationSource;
use crate::stream::DEFAULT_TARGET_LABEL;

/// Configuration for the TaskRegistry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// When records are evicted
    pub retention: RetentionPolicy,
    /// Maximum number of workers talking to the remote at once
    pub max_concurrent: usize,
    /// Upper bound on one remote call, from connect to end of stream
    pub remote_timeout: Duration,
    /// Channel whose fragments form the payload
    pub target_label: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::default(),
            max_concurrent: 5,
            remote_timeout: Duration::from_secs(600),
            target_label: DEFAULT_TARGET_LABEL.to_string(),
        }
    }
}

struct Inner {
    tasks: RwLock<HashMap<String, TaskRecord>>,
    source: Arc<dyn GenerationSource>,
    permits: Semaphore,
    config: RegistryConfig,
}

/// Shared handle to the task registry; clones refer to the same map
#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<Inner>,
}

impl TaskRegistry {
    pub fn new(source: Arc<dyn GenerationSource>, config: RegistryConfig) -> Self {
        let permits = Semaphore::new(config.max_concurrent.max(1));
        Self {
            inner: Arc::new(Inner {
                tasks: RwLock::new(HashMap::new()),
                source,
                permits,
                config,
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Register a new task and schedule its worker
    ///
    /// The record is inserted as `pending` before the worker is spawned, so a
    /// status query issued right after this returns always finds it.
    pub async fn create(&self, documents: DocumentPair) -> Result<String> {
        documents.validate()?;

        let id = {
            let mut tasks = self.inner.tasks.write().await;
            let mut record = TaskRecord::new(documents.clone());
            while tasks.contains_key(&record.id) {
                record = TaskRecord::new(documents.clone());
            }
            let id = record.id.clone();
            tasks.insert(id.clone(), record);
            id
        };

        tracing::info!(task_id = %id, cv_url = %documents.cv_url, "Task accepted");
        worker::spawn(self.clone(), id.clone(), documents);
        Ok(id)
    }

    /// Look up a task
    ///
    /// A record that has already outlived the retention policy but has not
    /// been swept yet is removed here and reported as not found.
    pub async fn get_status(&self, id: &str) -> Result<TaskRecord> {
        let now = now_ms();
        let record = {
            let tasks = self.inner.tasks.read().await;
            tasks.get(id).cloned()
        };

        match record {
            Some(record) if !self.inner.config.retention.is_expired(&record, now) => Ok(record),
            Some(_) => {
                let mut tasks = self.inner.tasks.write().await;
                let retention = &self.inner.config.retention;
                if tasks.get(id).is_some_and(|r| retention.is_expired(r, now)) {
                    tasks.remove(id);
                    tracing::debug!(task_id = %id, "Expired task removed on lookup");
                }
                Err(CvAgentError::TaskNotFound(id.to_string()))
            }
            None => Err(CvAgentError::TaskNotFound(id.to_string())),
        }
    }

    /// Remove every expired record; returns how many were removed
    pub async fn sweep(&self) -> usize {
        self.sweep_at(now_ms()).await
    }

    /// Sweep as if the current time were `now` (ms since epoch)
    pub async fn sweep_at(&self, now: i64) -> usize {
        let retention = self.inner.config.retention;
        let mut tasks = self.inner.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, record| !retention.is_expired(record, now));
        let removed = before - tasks.len();

        if removed > 0 {
            tracing::info!(removed, remaining = tasks.len(), "Evicted expired tasks");
        }
        removed
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.inner.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Write a state transition for `id`
    ///
    /// Returns false if the record is gone (evicted) or the transition is not
    /// allowed; in both cases nothing is written.
    pub(crate) async fn apply(&self, id: &str, next: TaskState) -> bool {
        let mut tasks = self.inner.tasks.write().await;
        let Some(record) = tasks.get_mut(id) else {
            tracing::debug!(task_id = %id, "Task evicted, discarding update");
            return false;
        };

        let from = record.status();
        let to = next.status();
        if !record.advance(next) {
            tracing::warn!(task_id = %id, ?from, ?to, "Rejected invalid task transition");
            return false;
        }
        true
    }

    pub(crate) async fn acquire_permit(
        &self,
    ) -> std::result::Result<SemaphorePermit<'_>, tokio::sync::AcquireError> {
        self.inner.permits.acquire().await
    }

    pub(crate) fn source(&self) -> &dyn GenerationSource {
        self.inner.source.as_ref()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("config", &self.inner.config)
            .finish()
    }
}
