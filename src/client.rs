//! Client for a running cvagent server.
//!
//! Used by the `submit` and `status` commands: create a task, then poll it
//! until it reaches a terminal state.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};

use crate::domain::{DocumentPair, TaskRecord};
use crate::error::{CvAgentError, Result};
use crate::server::{CreateTaskRequest, CreateTaskResponse};

/// Polling schedule for [`TaskClient::wait_for_terminal`]
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Pause between creating the task and the first poll
    pub initial_delay: Duration,
    /// Pause between polls
    pub interval: Duration,
    /// Give up after this long
    pub max_wait: Duration,
    /// A 404 within this window is retried; after it, it is final
    pub not_found_grace: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            interval: Duration::from_secs(60),
            max_wait: Duration::from_secs(600),
            not_found_grace: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskClient {
    client: Client,
    base_url: String,
}

impl TaskClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CvAgentError::Remote(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Submit a document pair; returns the new task id
    pub async fn create(&self, documents: &DocumentPair) -> Result<String> {
        let request = CreateTaskRequest {
            cv_url: documents.cv_url.clone(),
            report_url: documents.report_url.clone(),
        };

        let response = self
            .client
            .post(format!("{}/scrape-cv", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| CvAgentError::Remote(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CvAgentError::Remote(format!("Server error {}: {}", status, body)));
        }

        let created: CreateTaskResponse = response
            .json()
            .await
            .map_err(|e| CvAgentError::Remote(format!("Failed to parse response: {}", e)))?;
        Ok(created.task_id)
    }

    /// Fetch a task's current record; `None` if the server does not know it
    pub async fn status(&self, task_id: &str) -> Result<Option<TaskRecord>> {
        let response = self
            .client
            .get(format!("{}/status/{}", self.base_url, task_id))
            .send()
            .await
            .map_err(|e| CvAgentError::Remote(format!("Request failed: {}", e)))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let record = response
                    .json()
                    .await
                    .map_err(|e| CvAgentError::Remote(format!("Failed to parse response: {}", e)))?;
                Ok(Some(record))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(CvAgentError::Remote(format!("Server error {}: {}", status, body)))
            }
        }
    }

    /// Poll until the task is terminal
    ///
    /// `on_poll` sees every answer (`None` for a not-found response).
    pub async fn wait_for_terminal<F>(
        &self,
        task_id: &str,
        poll: &PollConfig,
        mut on_poll: F,
    ) -> Result<TaskRecord>
    where
        F: FnMut(Option<&TaskRecord>),
    {
        tokio::time::sleep(poll.initial_delay).await;
        let started = Instant::now();

        loop {
            let record = self.status(task_id).await?;
            on_poll(record.as_ref());

            match record {
                Some(record) if record.is_terminal() => return Ok(record),
                Some(_) => {}
                None if started.elapsed() < poll.not_found_grace => {}
                None => return Err(CvAgentError::TaskNotFound(task_id.to_string())),
            }

            if started.elapsed() + poll.interval > poll.max_wait {
                return Err(CvAgentError::Remote(format!(
                    "Task {} not finished after {}s",
                    task_id,
                    poll.max_wait.as_secs()
                )));
            }
            tokio::time::sleep(poll.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Payload, TaskState, TaskStatus};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_poll() -> PollConfig {
        PollConfig {
            initial_delay: Duration::ZERO,
            interval: Duration::from_millis(10),
            max_wait: Duration::from_millis(200),
            not_found_grace: Duration::from_millis(50),
        }
    }

    fn documents() -> DocumentPair {
        DocumentPair::new("https://example.com/cv.pdf", "https://example.com/report.pdf")
    }

    #[tokio::test]
    async fn test_create_returns_task_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape-cv"))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(json!({"task_id": "t-1", "status": "accepted"})),
            )
            .mount(&server)
            .await;

        let client = TaskClient::new(server.uri()).unwrap();
        assert_eq!(client.create(&documents()).await.unwrap(), "t-1");
    }

    #[tokio::test]
    async fn test_create_surfaces_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/scrape-cv"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad url"))
            .mount(&server)
            .await;

        let client = TaskClient::new(server.uri()).unwrap();
        let err = client.create(&documents()).await.unwrap_err();
        assert!(err.to_string().contains("400"));
    }

    #[tokio::test]
    async fn test_status_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = TaskClient::new(server.uri()).unwrap();
        assert!(client.status("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wait_for_terminal_returns_completed_record() {
        let server = MockServer::start().await;
        let mut record = TaskRecord::with_id("t-2", documents());
        record.advance(TaskState::Running);
        record.advance(TaskState::Completed {
            payload: Payload::parse(r#"{"ok": true}"#).unwrap(),
        });
        Mock::given(method("GET"))
            .and(path("/status/t-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&record))
            .mount(&server)
            .await;

        let client = TaskClient::new(server.uri()).unwrap();
        let mut polls = 0;
        let result = client
            .wait_for_terminal("t-2", &fast_poll(), |_| polls += 1)
            .await
            .unwrap();
        assert_eq!(result.status(), TaskStatus::Completed);
        assert_eq!(polls, 1);
    }

    #[tokio::test]
    async fn test_wait_for_terminal_gives_up_on_persistent_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = TaskClient::new(server.uri()).unwrap();
        let result = client.wait_for_terminal("gone", &fast_poll(), |_| {}).await;
        assert!(matches!(result, Err(CvAgentError::TaskNotFound(_))));
    }

    #[tokio::test]
    async fn test_wait_for_terminal_times_out_while_running() {
        let server = MockServer::start().await;
        let mut record = TaskRecord::with_id("t-3", documents());
        record.advance(TaskState::Running);
        Mock::given(method("GET"))
            .and(path("/status/t-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&record))
            .mount(&server)
            .await;

        let client = TaskClient::new(server.uri()).unwrap();
        let result = client.wait_for_terminal("t-3", &fast_poll(), |_| {}).await;
        assert!(matches!(result, Err(CvAgentError::Remote(msg)) if msg.contains("not finished")));
    }
}
