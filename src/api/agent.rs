//! Agent API handlers
//!
//! Connection to the orchestrator and the scenario start/stop commands the
//! orchestrator dispatches.

use crate::api::middleware::with_common_layers;
use crate::api::types::{ConnectRequest, MessageResponse, StartScenarioRequest};
use crate::api::{health, HealthResponse};
use crate::error::AppError;
use crate::state::{AgentSession, AgentState, RunnerStatus};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::path::Path;

/// Agent status response
#[derive(Debug, Serialize)]
pub struct AgentStatusResponse {
    /// Human-readable banner
    pub message: String,
    /// Connection state
    pub state: AgentSession,
    /// Scenario runner state
    pub runner: RunnerStatus,
}

/// Build the agent router
pub fn router(state: AgentState) -> Router {
    let router = Router::new()
        .route("/", get(agent_status))
        .route("/api/health", get(health_check))
        .route("/api/status", get(agent_status))
        .route("/api/connect", post(connect))
        .route("/api/scenario/start", post(start_scenario))
        .route("/api/scenario/stop", post(stop_scenario))
        .with_state(state);

    with_common_layers(router)
}

async fn health_check() -> Json<HealthResponse> {
    health("agent")
}

/// GET /api/status - Connection and runner state
pub async fn agent_status(State(state): State<AgentState>) -> Json<AgentStatusResponse> {
    let session = state.session.read().await.clone();
    let runner = state.runner.status().await;
    Json(AgentStatusResponse {
        message: "LISE Agent is running.".to_string(),
        state: session,
        runner,
    })
}

/// POST /api/connect - Register this agent with an orchestrator
pub async fn connect(
    State(state): State<AgentState>,
    Json(request): Json<ConnectRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state
        .connect(&request.display_name, &request.orchestrator_ip)
        .await?;
    Ok(Json(MessageResponse::success(message)))
}

/// POST /api/scenario/start - Bring a scenario up and start shipping its logs
pub async fn start_scenario(
    State(state): State<AgentState>,
    Json(request): Json<StartScenarioRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    // Captured once; later reconnects do not redirect a running scenario
    let target = state.session.read().await.log_target();

    let compose_file = Path::new(&request.compose_file_path);
    state.runner.start(compose_file, target).await?;

    Ok(Json(MessageResponse::success(format!(
        "Scenario started: {}",
        request.compose_file_path
    ))))
}

/// POST /api/scenario/stop - Bring the running scenario down
pub async fn stop_scenario(
    State(state): State<AgentState>,
) -> Result<Json<MessageResponse>, AppError> {
    let compose_file = state.runner.stop().await?;
    Ok(Json(MessageResponse::success(format!(
        "Scenario stopped: {}",
        compose_file.display()
    ))))
}
