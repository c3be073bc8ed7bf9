//! HTTP client for the agents generation backend.
//!
//! Wraps the backend's tool-invocation endpoint (`POST /tools/{tool}/invoke`)
//! using [`reqwest`], mapping transport and non-2xx responses into
//! [`GeneratorError`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::generator::{ArtifactGenerator, GeneratorError};

/// Response returned by the backend after executing a tool.
#[derive(Debug, Deserialize)]
struct InvokeResponse {
    /// Raw generated text.
    output: String,
}

/// HTTP client for one agents backend.
pub struct AgentsClient {
    client: reqwest::Client,
    base_url: String,
}

impl AgentsClient {
    /// Create a new client.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://localhost:8700`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling across workspaces).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ArtifactGenerator for AgentsClient {
    async fn generate(&self, tool: &str, input: &Value) -> Result<String, GeneratorError> {
        let url = format!("{}/tools/{tool}/invoke", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "input": input }))
            .send()
            .await
            .map_err(|e| GeneratorError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(tool, status = status.as_u16(), "Agents backend refused tool call");
            return Err(GeneratorError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: InvokeResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Transport(format!("malformed backend response: {e}")))?;

        Ok(parsed.output)
    }
}
