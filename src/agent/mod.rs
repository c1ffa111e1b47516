//! Agent-runner collaborator

pub mod http;
pub mod runner;

pub use http::HttpAgentRunner;
pub use runner::{
    AgentRunner, CreateSandboxRequest, CreateSandboxResponse, GithubAppStatus, RunAgentAck,
    RunAgentRequest,
};
