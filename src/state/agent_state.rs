// Agent-side state
// Connection bookkeeping plus the scenario runner, shared by the agent's handlers

use crate::api::types::RegisterAgentRequest;
use crate::config::{AgentConfig, DEFAULT_AGENT_PORT};
use crate::error::AppError;
use crate::executor::ScenarioBackend;
use crate::services::{network, peer, PeerClient};
use crate::state::runner::{LogTarget, ScenarioRunner, TailSettings};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Connection state of this agent
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AgentSession {
    /// Whether the last registration succeeded
    pub connected: bool,
    /// Orchestrator address as the operator entered it
    pub orchestrator_address: Option<String>,
    /// Orchestrator base URL derived from the address
    #[serde(skip)]
    pub orchestrator_url: Option<String>,
    /// Name this agent registered under
    pub display_name: Option<String>,
    /// Human-readable connection status
    pub status_message: String,
}

impl Default for AgentSession {
    fn default() -> Self {
        Self {
            connected: false,
            orchestrator_address: None,
            orchestrator_url: None,
            display_name: None,
            status_message: "Disconnected".to_string(),
        }
    }
}

impl AgentSession {
    /// Log destination for a scenario started now, if registered
    pub fn log_target(&self) -> Option<LogTarget> {
        if !self.connected {
            return None;
        }
        Some(LogTarget {
            orchestrator: self.orchestrator_url.clone()?,
            agent_name: self.display_name.clone()?,
        })
    }
}

/// Shared state for the agent API
#[derive(Clone)]
pub struct AgentState {
    /// Connection bookkeeping
    pub session: Arc<RwLock<AgentSession>>,
    /// Scenario lifecycle
    pub runner: Arc<ScenarioRunner>,
    /// Outbound HTTP client
    pub client: PeerClient,
    /// Agent configuration
    pub config: Arc<AgentConfig>,
}

impl AgentState {
    /// Build agent state around a scenario backend
    pub fn new(config: AgentConfig, backend: Arc<dyn ScenarioBackend>) -> Self {
        let client = PeerClient::new();
        let runner = ScenarioRunner::new(
            backend,
            client.clone(),
            TailSettings {
                grace: config.log_grace,
                delivery_timeout: config.log_delivery_timeout,
            },
        );

        Self {
            session: Arc::new(RwLock::new(AgentSession::default())),
            runner: Arc::new(runner),
            client,
            config: Arc::new(config),
        }
    }

    /// Address sent to the orchestrator on registration
    ///
    /// The configured override wins; otherwise the outbound interface
    /// address, with the port appended when it is not the default.
    pub fn advertised_address(&self) -> String {
        if let Some(address) = &self.config.advertise_address {
            return address.clone();
        }
        let ip = network::local_ip();
        if self.config.server.port == DEFAULT_AGENT_PORT {
            ip.to_string()
        } else {
            std::net::SocketAddr::new(ip, self.config.server.port).to_string()
        }
    }

    /// Register with the orchestrator at `orchestrator_address`
    ///
    /// A single attempt. The session reports disconnected until the
    /// orchestrator answers; on failure it stays disconnected with the reason
    /// and the error is returned.
    pub async fn connect(
        &self,
        display_name: &str,
        orchestrator_address: &str,
    ) -> Result<String, AppError> {
        let display_name = display_name.trim();
        let orchestrator_address = orchestrator_address.trim();
        if display_name.is_empty() {
            return Err(AppError::InvalidRequest(
                "display_name cannot be empty".to_string(),
            ));
        }
        if orchestrator_address.is_empty() {
            return Err(AppError::InvalidRequest(
                "orchestrator_ip cannot be empty".to_string(),
            ));
        }

        let orchestrator_url = peer::base_url(orchestrator_address, self.config.orchestrator_port);
        {
            // No log target while the registration is in flight
            let mut session = self.session.write().await;
            session.connected = false;
            session.status_message = format!("Connecting to {}", orchestrator_address);
        }

        let request = RegisterAgentRequest {
            display_name: display_name.to_string(),
            ip_address: self.advertised_address(),
        };

        let result = self
            .client
            .register(&orchestrator_url, &request, self.config.register_timeout)
            .await;

        let mut session = self.session.write().await;
        session.display_name = Some(display_name.to_string());
        session.orchestrator_address = Some(orchestrator_address.to_string());
        session.orchestrator_url = Some(orchestrator_url.clone());
        match result {
            Ok(_) => {
                session.connected = true;
                session.status_message = format!("Connected to {}", orchestrator_address);
                info!(
                    orchestrator = %orchestrator_url,
                    display_name = %display_name,
                    ip_address = %request.ip_address,
                    "Registered with orchestrator"
                );
                Ok(session.status_message.clone())
            }
            Err(e) => {
                session.connected = false;
                session.status_message = format!("Failed to connect to orchestrator: {}", e);
                error!(
                    orchestrator = %orchestrator_url,
                    error = %e,
                    "Could not register with orchestrator"
                );
                Err(e)
            }
        }
    }
}
