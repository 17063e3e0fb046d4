//! HTTP client for the provider's management API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::model::{Instance, InstanceState, Snapshot, Volume};
use crate::{ComputeProvider, Result};

// Provider-default waiter budget: poll every 15s, give up after 40 polls.
const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(15);
const WAIT_MAX_ATTEMPTS: u32 = 40;

/// Provider API client over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
    poll_interval: Duration,
    wait_attempts: u32,
}

impl HttpProvider {
    /// Create a new client for the given endpoint and optional bearer token.
    pub fn new(api_url: &str, token: Option<&str>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}"))
                    .context("Invalid token format")?,
            );
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: api_url.trim_end_matches('/').to_string(),
            poll_interval: WAIT_POLL_INTERVAL,
            wait_attempts: WAIT_MAX_ATTEMPTS,
        })
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        debug!(path, "GET");
        let response = self.client.get(self.url(path)).send().await?;

        self.handle_response(response).await
    }

    /// Make a POST request with a JSON body.
    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        debug!(path, "POST");
        let response = self.client.post(self.url(path)).json(body).send().await?;

        self.handle_response(response).await
    }

    /// Make a bodyless POST request to a lifecycle action endpoint.
    async fn post_action(&self, path: &str) -> Result<()> {
        debug!(path, "POST");
        let response = self.client.post(self.url(path)).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            self.handle_error(response).await
        }
    }

    /// Handle a successful or error response.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                ProviderError::Other(anyhow::anyhow!("Failed to parse response: {}", e))
            })
        } else {
            self.handle_error(response).await
        }
    }

    /// Handle an error response.
    async fn handle_error<T>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status().as_u16();

        // Try to parse error response
        let error_body: ApiErrorResponse =
            response.json().await.unwrap_or_else(|_| ApiErrorResponse {
                code: "unknown".to_string(),
                message: "Unknown error".to_string(),
            });

        if status == 401 {
            return Err(ProviderError::NotAuthenticated);
        }

        Err(ProviderError::api(status, error_body.code, error_body.message))
    }

    /// Poll the instance until it reports the target state.
    async fn wait_for_state(&self, id: &str, target: InstanceState) -> Result<()> {
        for attempt in 1..=self.wait_attempts {
            let instance = self.get_instance(id).await?;
            if instance.state == target {
                return Ok(());
            }
            debug!(
                instance = id,
                state = %instance.state,
                target = %target,
                attempt,
                "waiting for state transition"
            );
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(ProviderError::WaitTimeout {
            instance: id.to_string(),
            target: target.as_str(),
        })
    }
}

#[async_trait]
impl ComputeProvider for HttpProvider {
    async fn list_instances(&self, project: Option<&str>) -> Result<Vec<Instance>> {
        debug!(path = "/v1/instances", ?project, "GET");
        let mut request = self.client.get(self.url("/v1/instances"));
        if let Some(project) = project {
            // Tag values may carry reserved characters; let reqwest encode.
            request = request.query(&[("project", project)]);
        }
        let response = request.send().await?;

        let list: ListResponse<Instance> = self.handle_response(response).await?;
        Ok(list.items)
    }

    async fn get_instance(&self, id: &str) -> Result<Instance> {
        self.get(&format!("/v1/instances/{id}")).await
    }

    async fn list_volumes(&self, instance_id: &str) -> Result<Vec<Volume>> {
        let response: ListResponse<Volume> =
            self.get(&format!("/v1/instances/{instance_id}/volumes")).await?;
        Ok(response.items)
    }

    async fn list_snapshots(&self, volume_id: &str) -> Result<Vec<Snapshot>> {
        let response: ListResponse<Snapshot> =
            self.get(&format!("/v1/volumes/{volume_id}/snapshots")).await?;
        Ok(response.items)
    }

    async fn stop_instance(&self, id: &str) -> Result<()> {
        self.post_action(&format!("/v1/instances/{id}/stop")).await
    }

    async fn start_instance(&self, id: &str) -> Result<()> {
        self.post_action(&format!("/v1/instances/{id}/start")).await
    }

    async fn reboot_instance(&self, id: &str) -> Result<()> {
        self.post_action(&format!("/v1/instances/{id}/reboot")).await
    }

    async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<Snapshot> {
        self.post(
            &format!("/v1/volumes/{volume_id}/snapshots"),
            &CreateSnapshotRequest { description },
        )
        .await
    }

    async fn wait_until_stopped(&self, id: &str) -> Result<()> {
        self.wait_for_state(id, InstanceState::Stopped).await
    }

    async fn wait_until_running(&self, id: &str) -> Result<()> {
        self.wait_for_state(id, InstanceState::Running).await
    }
}

/// Generic list envelope returned by collection endpoints.
#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    items: Vec<T>,
}

#[derive(Debug, Serialize)]
struct CreateSnapshotRequest<'a> {
    description: &'a str,
}

/// API error response structure.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    code: String,
    message: String,
}
