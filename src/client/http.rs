//! Async HTTP access to the aw-server REST API.

use crate::client::{ClientError, Event, CLIENT_NAME};
use serde::Serialize;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host (default: 127.0.0.1)
    pub host: String,
    /// Server port
    pub port: u16,
    /// Name reported as the bucket's client
    pub client_name: String,
    /// Host the events come from
    pub hostname: String,
}

impl ClientConfig {
    /// Create a new client configuration for this machine.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            host: host.into(),
            port,
            client_name: CLIENT_NAME.to_string(),
            hostname,
        }
    }

    /// Get the full server URL.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Get the server info endpoint URL.
    pub fn info_url(&self) -> String {
        format!("{}/api/0/info", self.url())
    }

    /// Get the URL of a bucket.
    pub fn bucket_url(&self, bucket_id: &str) -> String {
        format!("{}/api/0/buckets/{}", self.url(), bucket_id)
    }

    /// Get the heartbeat URL of a bucket.
    pub fn heartbeat_url(&self, bucket_id: &str, pulsetime: f64) -> String {
        format!("{}/heartbeat?pulsetime={}", self.bucket_url(bucket_id), pulsetime)
    }

    /// The bucket this client reports into: `{client_name}_{hostname}`.
    pub fn bucket_id(&self) -> String {
        format!("{}_{}", self.client_name, self.hostname)
    }
}

#[derive(Debug, Serialize)]
struct CreateBucket<'a> {
    client: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    hostname: &'a str,
}

/// Async client for aw-server.
pub struct AwClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl AwClient {
    /// Create a new client.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the server info document.
    pub async fn info(&self) -> Result<serde_json::Value, ClientError> {
        let response = self
            .client
            .get(self.config.info_url())
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    /// Create a bucket; an existing bucket is not an error.
    pub async fn create_bucket(
        &self,
        bucket_id: &str,
        event_type: &str,
    ) -> Result<(), ClientError> {
        let body = CreateBucket {
            client: &self.config.client_name,
            event_type,
            hostname: &self.config.hostname,
        };

        let response = self
            .client
            .post(self.config.bucket_url(bucket_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        // 304 means the bucket already exists
        if response.status() == reqwest::StatusCode::NOT_MODIFIED {
            return Ok(());
        }
        check_status(response).await.map(|_| ())
    }

    /// Send a heartbeat event.
    pub async fn heartbeat(
        &self,
        bucket_id: &str,
        event: &Event,
        pulsetime: f64,
    ) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.config.heartbeat_url(bucket_id, pulsetime))
            .json(event)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        check_status(response).await.map(|_| ())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}
