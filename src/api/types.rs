//! Wire types shared by the orchestrator and agent APIs
//!
//! Field names match the JSON bodies exchanged between the two services and
//! the browser UI.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generic `{status, message}` response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageResponse {
    /// Status indicator (e.g., "success")
    pub status: String,
    /// Human-readable message
    pub message: String,
}

impl MessageResponse {
    /// Build a `"success"` response
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// POST /api/agents/register (orchestrator)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAgentRequest {
    /// Unique agent name
    pub display_name: String,
    /// Address the orchestrator uses to reach the agent
    pub ip_address: String,
}

/// POST /api/connect (agent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    /// Name this agent registers under
    pub display_name: String,
    /// Orchestrator host, `host:port` or URL
    pub orchestrator_ip: String,
}

/// POST /api/scenario/start (agent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartScenarioRequest {
    /// Compose file on the agent's filesystem
    pub compose_file_path: String,
}

/// POST /api/simulation/start (orchestrator)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchStartRequest {
    /// Registered agent to command
    pub agent_name: String,
    /// Discovered scenario to start
    pub scenario_name: String,
}

/// POST /api/simulation/stop (orchestrator)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchStopRequest {
    /// Registered agent to command
    pub agent_name: String,
}

/// One container log line shipped from an agent (POST /api/log)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogLine {
    /// Agent that produced the line
    pub agent_name: String,
    /// Raw line text
    pub log_line: String,
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.agent_name, self.log_line)
    }
}
