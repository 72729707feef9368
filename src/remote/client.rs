//! HTTP client for the hosted generative workflow.
//!
//! One POST per task against `{base_url}/{app_id}/run`; the response body is
//! newline-delimited JSON and is handed back as a [`LineStream`] without
//! buffering.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{Value, json};

use crate::domain::{DocumentPair, TaskFailure};
use crate::error::{CvAgentError, Result};
use crate::remote::source::GenerationSource;
use crate::stream::{LineStream, decode_lines};

/// Default base URL for released workflow apps
pub const DEFAULT_BASE_URL: &str = "https://app.wordware.ai/api/released-app";

/// Default app version constraint sent with every run
pub const DEFAULT_VERSION: &str = "^1.1";

/// Maximum number of characters of an error body kept in a failure reason
const MAX_DETAIL_CHARS: usize = 512;

/// Configuration for the workflow client
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub base_url: String,
    pub app_id: String,
    pub api_key: String,
    pub version: String,
    pub connect_timeout: Duration,
}

impl WorkflowConfig {
    pub fn new(app_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            app_id: app_id.into(),
            api_key: api_key.into(),
            version: DEFAULT_VERSION.to_string(),
            connect_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Streaming client for one workflow app
pub struct WorkflowClient {
    client: Client,
    config: WorkflowConfig,
}

impl WorkflowClient {
    /// Create a client; fails if the app id or key is missing
    pub fn new(config: WorkflowConfig) -> Result<Self> {
        if config.app_id.is_empty() {
            return Err(CvAgentError::Config("workflow app id not set".to_string()));
        }
        if config.api_key.is_empty() {
            return Err(CvAgentError::Config("workflow API key not set".to_string()));
        }

        // No overall timeout: the body is a long-lived stream and the registry
        // bounds the whole call itself.
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| CvAgentError::Remote(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn run_url(&self) -> String {
        format!(
            "{}/{}/run",
            self.config.base_url.trim_end_matches('/'),
            self.config.app_id
        )
    }

    /// Build the run request body for a document pair
    fn build_request(&self, documents: &DocumentPair) -> Value {
        json!({
            "inputs": {
                "CV": file_input(&documents.cv_url, "CV"),
                "report": file_input(&documents.report_url, "report"),
            },
            "version": self.config.version,
        })
    }
}

fn file_input(url: &str, name: &str) -> Value {
    json!({
        "type": "file",
        "file_type": "application/pdf",
        "file_url": url,
        "file_name": name,
    })
}

fn truncate_detail(detail: String) -> String {
    if detail.chars().count() <= MAX_DETAIL_CHARS {
        return detail;
    }
    let mut truncated: String = detail.chars().take(MAX_DETAIL_CHARS).collect();
    truncated.push_str("...");
    truncated
}

#[async_trait]
impl GenerationSource for WorkflowClient {
    async fn open(&self, documents: &DocumentPair) -> std::result::Result<LineStream, TaskFailure> {
        let body = self.build_request(documents);

        let response = self
            .client
            .post(self.run_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TaskFailure::RemoteCallFailed {
                status: None,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TaskFailure::RemoteCallFailed {
                status: Some(status.as_u16()),
                detail: truncate_detail(error_body),
            });
        }

        log::debug!("Workflow {} accepted run, streaming response", self.config.app_id);
        Ok(decode_lines(response.bytes_stream().boxed()))
    }
}

impl std::fmt::Debug for WorkflowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowClient")
            .field("base_url", &self.config.base_url)
            .field("app_id", &self.config.app_id)
            .finish()
    }
}
