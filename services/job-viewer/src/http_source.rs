//! HTTP implementation of the viewer's data source.
//!
//! Every request is a POST of `{"action": ..., "data": {...}}` to the API
//! endpoint; every response is an `{ok, errors, data}` envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use frame_cache::{ApiResponse, DataSource, FramePayload};
use viewer_common::{FrameKey, JobListing, ViewerError, ViewerResult};

/// Client for the forecast job API.
pub struct HttpDataSource {
    client: Client,
    endpoint: String,
}

impl HttpDataSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> ViewerResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ViewerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn call<D, T>(&self, action: &str, data: D) -> ViewerResult<T>
    where
        D: Serialize,
        T: DeserializeOwned,
    {
        debug!(action, endpoint = %self.endpoint, "API request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "action": action, "data": data }))
            .send()
            .await
            .map_err(|e| ViewerError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ViewerError::Transport(e.to_string()))?;

        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(envelope) => envelope.into_result(),
            Err(_) if !status.is_success() => Err(ViewerError::Transport(format!(
                "HTTP {} from {}",
                status, self.endpoint
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch_job(&self, job_id: &str) -> ViewerResult<JobListing> {
        self.call("get_job", json!({ "job_id": job_id })).await
    }

    async fn fetch_frame(&self, key: &FrameKey) -> ViewerResult<FramePayload> {
        self.call(
            "get_frame",
            json!({
                "job_id": key.job_id,
                "valid_time": key.valid_time,
                "variable": key.variable,
                "level": key.level,
            }),
        )
        .await
    }
}
