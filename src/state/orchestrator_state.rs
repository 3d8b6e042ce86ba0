// Orchestrator-side state
// Registry, log relay and outbound client shared by the orchestrator's handlers

use crate::config::OrchestratorConfig;
use crate::services::PeerClient;
use crate::state::registry::Registry;
use crate::websocket::LogRelay;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared state for the orchestrator API
#[derive(Clone)]
pub struct OrchestratorState {
    /// Agents and scenarios
    pub registry: Arc<RwLock<Registry>>,
    /// Fan-out hub for viewer sockets
    pub relay: LogRelay,
    /// Outbound HTTP client for agent commands
    pub client: PeerClient,
    /// Orchestrator configuration
    pub config: Arc<OrchestratorConfig>,
}

impl OrchestratorState {
    /// Build state around an already loaded registry
    pub fn new(config: OrchestratorConfig, registry: Registry) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            relay: LogRelay::new(),
            client: PeerClient::new(),
            config: Arc::new(config),
        }
    }
}
