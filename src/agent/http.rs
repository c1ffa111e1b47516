//! Agent-runner HTTP client

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error, info};

use super::runner::{
    AgentRunner, CreateSandboxRequest, CreateSandboxResponse, GithubAppStatus, RunAgentAck,
    RunAgentRequest,
};

/// HTTP client for the agent-runner backend
pub struct HttpAgentRunner {
    client: Client,
    base_url: String,
}

impl HttpAgentRunner {
    /// Create a new client with timeouts
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new()); // Fallback if config fails

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AgentRunner for HttpAgentRunner {
    async fn run_agent(&self, request: &RunAgentRequest) -> Result<RunAgentAck> {
        let url = format!("{}/run-claude-agent", self.base_url);

        debug!(
            "Starting agent run for chat {} (repo: {:?})",
            request.chat_id, request.repo_url
        );

        let response = match self.client.post(&url).json(request).send().await {
            Ok(r) => r,
            Err(e) => {
                error!("Agent backend HTTP error: {}", e);
                return Err(e).context("Failed to connect to the agent backend");
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Agent backend error: {} - {}", status, body);
        }

        let ack: RunAgentAck = response
            .json()
            .await
            .context("Failed to parse agent backend response")?;

        Ok(ack)
    }

    async fn create_sandbox(&self, request: &CreateSandboxRequest) -> Result<CreateSandboxResponse> {
        let url = format!("{}/create-sandbox", self.base_url);

        debug!(
            "Requesting sandbox for chat {} ({})",
            request.chat_id, request.repo_url
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Failed to connect to the agent backend")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Agent backend error: {} - {}", status, body);
        }

        let result: CreateSandboxResponse = response
            .json()
            .await
            .context("Failed to parse agent backend response")?;

        if let Some(snapshot_id) = &result.snapshot_id {
            info!("Sandbox ready, snapshot {}", snapshot_id);
        }

        Ok(result)
    }

    async fn check_github_app(&self, handle: &str) -> Result<GithubAppStatus> {
        let url = format!("{}/check-github-app/{}", self.base_url, handle);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect to the agent backend")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Agent backend error: {} - {}", status, body);
        }

        let result: GithubAppStatus = response
            .json()
            .await
            .context("Failed to parse agent backend response")?;

        Ok(result)
    }
}
