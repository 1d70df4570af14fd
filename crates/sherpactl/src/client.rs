//! HTTP client for the sherpad API.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use sherpa_common::{
    ChatRequest, ChatResponse, ChatTurn, HealthResponse, MetricsSnapshot, ServiceClientStatus,
};
use std::collections::BTreeMap;

/// Thin client over the daemon's HTTP surface.
pub struct DaemonClient {
    client: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /v1/health
    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("/v1/health").await
    }

    /// GET /v1/metrics
    pub async fn metrics(&self) -> Result<MetricsSnapshot> {
        self.get("/v1/metrics").await
    }

    /// GET /v1/services
    pub async fn services(&self) -> Result<BTreeMap<String, ServiceClientStatus>> {
        self.get("/v1/services").await
    }

    /// POST /v1/chat with the full replayed history.
    pub async fn chat(
        &self,
        message: &str,
        history: Vec<ChatTurn>,
        user_id: Option<String>,
    ) -> Result<ChatResponse> {
        let request = ChatRequest {
            message: message.to_string(),
            history,
            user_id,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .context("Failed to connect to sherpad. Is the daemon running?")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Daemon rejected the chat request ({}): {}", status, text);
        }

        response
            .json()
            .await
            .context("Failed to parse chat response from sherpad")
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .context("Failed to connect to sherpad. Is the daemon running?")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Daemon returned an error ({}): {}", status, text);
        }

        response
            .json()
            .await
            .context("Failed to parse response from sherpad")
    }
}
