//! Agent runner contract

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Backend service that runs the AI agent against a conversation.
///
/// `run_agent` only acknowledges that a run started: the agent writes its
/// replies into the conversation store, and they reach the client through
/// the message feed, not through this call's response.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Ask the backend to process a prompt against a (possibly absent) repo
    async fn run_agent(&self, request: &RunAgentRequest) -> Result<RunAgentAck>;

    /// Create or restore a sandbox for a conversation's repository
    async fn create_sandbox(&self, request: &CreateSandboxRequest) -> Result<CreateSandboxResponse>;

    /// Check whether the GitHub app is installed for a user
    async fn check_github_app(&self, handle: &str) -> Result<GithubAppStatus>;
}

#[derive(Debug, Clone, Serialize)]
pub struct RunAgentRequest {
    pub chat_id: String,
    pub repo_url: Option<String>,
    pub user_github_username: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunAgentAck {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl RunAgentAck {
    /// Any status other than these counts as a failed start
    pub fn is_started(&self) -> bool {
        matches!(self.status.as_str(), "started" | "success")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSandboxRequest {
    pub chat_id: String,
    pub repo_url: String,
    pub user_github_username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSandboxResponse {
    pub status: String,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub fork_url: Option<String>,
    #[serde(default)]
    pub original_repo: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl CreateSandboxResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubAppStatus {
    pub installed: bool,
    #[serde(default)]
    pub installation_id: Option<i64>,
}
