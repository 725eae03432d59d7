//! reqwest-backed client for the changeset service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use url::Url;

use super::types::{SubmitEnvelope, TaskStatusResponse};
use super::{RemoteApi, SubmitRequest, TASK_STATUS_PREFIX};
use crate::error::{DeployError, Result};

const USER_AGENT: &str = concat!("cset/", env!("CARGO_PKG_VERSION"));

/// Per-request ceiling; the poller's own budget is separate.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP client for one base address and credential.
pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpApi {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DeployError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Use a preconfigured client (proxy, TLS or timeout settings).
    pub fn with_client(client: reqwest::Client, base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined)
            .map_err(|e| DeployError::Config(format!("Invalid endpoint URL {}: {}", joined, e)))
    }

    /// Status URL with `task_id` escaped as a single path segment.
    fn task_status_url(&self, task_id: &str) -> Result<Url> {
        let mut url = self.endpoint(TASK_STATUS_PREFIX)?;
        url.path_segments_mut()
            .map_err(|_| {
                DeployError::Config(format!("Base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .push(task_id)
            .push("");
        Ok(url)
    }

    fn authorization(&self) -> String {
        format!("Api-Key {}", self.api_key)
    }
}

#[async_trait]
impl RemoteApi for HttpApi {
    async fn submit(&self, request: SubmitRequest<'_>) -> Result<SubmitEnvelope> {
        let mut url = self.endpoint(&request.path())?;
        if let Some(environment) = request.environment {
            url.query_pairs_mut().append_pair("environment", environment);
        }

        tracing::debug!(url = %url, kind = %request.kind, "Submitting changeset");

        let response = self
            .client
            .post(url.clone())
            .header(AUTHORIZATION, self.authorization())
            .header(CONTENT_TYPE, request.format.content_type())
            .header(ACCEPT, "application/json")
            .body(request.body)
            .send()
            .await
            .map_err(|e| DeployError::Transport(format!("POST {} failed: {}", url, e)))?;

        let text = read_success_body(response).await?;
        serde_json::from_str(&text).map_err(|e| {
            DeployError::Protocol(format!("Submission response could not be decoded: {}", e))
        })
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskStatusResponse> {
        let url = self.task_status_url(task_id)?;

        let response = self
            .client
            .get(url.clone())
            .header(AUTHORIZATION, self.authorization())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| DeployError::Transport(format!("GET {} failed: {}", url, e)))?;

        let text = read_success_body(response).await?;
        serde_json::from_str(&text).map_err(|e| {
            DeployError::Protocol(format!("Task status response could not be decoded: {}", e))
        })
    }
}

/// Return the body of a 2xx response, or an [`DeployError::Http`] carrying the
/// status and the body (status text when the body is empty).
async fn read_success_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("Unknown status").to_string()
        } else {
            body
        };
        return Err(DeployError::Http {
            status: status.as_u16(),
            body,
        });
    }

    response
        .text()
        .await
        .map_err(|e| DeployError::Transport(format!("Failed to read response body: {}", e)))
}
