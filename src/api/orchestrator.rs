//! Orchestrator API handlers
//!
//! Agent registration, scenario listing, command dispatch to agents and the
//! log intake that feeds the viewer relay.

use crate::api::middleware::with_common_layers;
use crate::api::types::{
    DispatchStartRequest, DispatchStopRequest, LogLine, MessageResponse, RegisterAgentRequest,
};
use crate::api::{health, HealthResponse};
use crate::error::AppError;
use crate::services::peer;
use crate::state::{OrchestratorState, Scenario};
use crate::websocket::log_stream_handler;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::info;

/// Agents list response
#[derive(Debug, Serialize)]
pub struct AgentsListResponse {
    /// Agent name -> address
    pub agents: BTreeMap<String, String>,
}

/// Scenarios list response
#[derive(Debug, Serialize)]
pub struct ScenariosListResponse {
    /// Scenarios in discovery order
    pub scenarios: Vec<Scenario>,
}

/// Acknowledgement for POST /api/log
#[derive(Debug, Serialize)]
pub struct LogAck {
    /// Always "log received"
    pub status: String,
}

/// Build the orchestrator router
pub fn router(state: OrchestratorState) -> Router {
    let router = Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/api/agents", get(list_agents))
        .route("/api/agents/register", post(register_agent))
        .route("/api/scenarios", get(list_scenarios))
        .route("/api/simulation/start", post(start_simulation))
        .route("/api/simulation/stop", post(stop_simulation))
        .route("/api/log", post(receive_log))
        .route("/ws/log-stream", get(log_stream_handler))
        .with_state(state);

    with_common_layers(router)
}

async fn root() -> Json<Value> {
    Json(serde_json::json!({ "message": "Welcome to the LISE Orchestrator!" }))
}

async fn health_check() -> Json<HealthResponse> {
    health("orchestrator")
}

/// POST /api/agents/register - Register or re-register an agent
pub async fn register_agent(
    State(state): State<OrchestratorState>,
    Json(request): Json<RegisterAgentRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let name = request.display_name.trim().to_string();
    let address = request.ip_address.trim().to_string();
    if name.is_empty() || address.is_empty() {
        return Err(AppError::InvalidRequest(
            "display_name and ip_address are required".to_string(),
        ));
    }

    let previous = state
        .registry
        .write()
        .await
        .register_agent(name.clone(), address.clone());

    match previous {
        Some(old) => info!(
            agent_name = %name,
            address = %address,
            previous_address = %old,
            "Agent re-registered"
        ),
        None => info!(agent_name = %name, address = %address, "Agent registered"),
    }

    Ok(Json(MessageResponse::success(format!(
        "Agent '{}' registered at {}",
        name, address
    ))))
}

/// GET /api/agents - List registered agents
pub async fn list_agents(State(state): State<OrchestratorState>) -> Json<AgentsListResponse> {
    let agents = state.registry.read().await.list_agents();
    Json(AgentsListResponse { agents })
}

/// GET /api/scenarios - List discovered scenarios
pub async fn list_scenarios(State(state): State<OrchestratorState>) -> Json<ScenariosListResponse> {
    let scenarios = state.registry.read().await.list_scenarios();
    Json(ScenariosListResponse { scenarios })
}

/// POST /api/simulation/start - Tell an agent to start a scenario
pub async fn start_simulation(
    State(state): State<OrchestratorState>,
    Json(request): Json<DispatchStartRequest>,
) -> Result<Json<Value>, AppError> {
    dispatch_start(&state, &request.agent_name, &request.scenario_name)
        .await
        .map(Json)
}

/// POST /api/simulation/stop - Tell an agent to stop its scenario
pub async fn stop_simulation(
    State(state): State<OrchestratorState>,
    Json(request): Json<DispatchStopRequest>,
) -> Result<Json<Value>, AppError> {
    dispatch_stop(&state, &request.agent_name).await.map(Json)
}

/// POST /api/log - Accept a log line from an agent and relay it to viewers
pub async fn receive_log(
    State(state): State<OrchestratorState>,
    Json(line): Json<LogLine>,
) -> Json<LogAck> {
    state.relay.broadcast(&line.to_string());
    Json(LogAck {
        status: "log received".to_string(),
    })
}

/// Resolve agent and scenario, then issue the start command
///
/// Unknown names fail before any network call. The agent's response body is
/// returned as-is; transport errors and non-2xx answers become
/// [`AppError::Upstream`].
pub async fn dispatch_start(
    state: &OrchestratorState,
    agent_name: &str,
    scenario_name: &str,
) -> Result<Value, AppError> {
    let (agent, scenario) = {
        let registry = state.registry.read().await;
        (
            registry.find_agent(agent_name)?,
            registry.find_scenario(scenario_name)?,
        )
    };

    let agent_url = peer::base_url(&agent.address, state.config.agent_port);
    info!(
        agent_name = %agent.name,
        agent_url = %agent_url,
        scenario = %scenario.name,
        compose_file = %scenario.compose_file_path.display(),
        "Dispatching scenario start"
    );

    state
        .client
        .start_scenario(
            &agent_url,
            &scenario.compose_file_path.to_string_lossy(),
            state.config.dispatch_timeout,
        )
        .await
}

/// Resolve the agent, then issue the stop command
pub async fn dispatch_stop(state: &OrchestratorState, agent_name: &str) -> Result<Value, AppError> {
    let agent = state.registry.read().await.find_agent(agent_name)?;

    let agent_url = peer::base_url(&agent.address, state.config.agent_port);
    info!(
        agent_name = %agent.name,
        agent_url = %agent_url,
        "Dispatching scenario stop"
    );

    state
        .client
        .stop_scenario(&agent_url, state.config.dispatch_timeout)
        .await
}
