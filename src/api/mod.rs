//! API module
//!
//! HTTP handlers and routers for the orchestrator and the agent.

pub mod agent;
pub mod middleware;
pub mod orchestrator;
pub mod types;

use axum::Json;
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" when the handler runs
    pub status: String,
    /// Crate version
    pub version: String,
    /// Which service answered
    pub service: String,
}

pub(crate) fn health(service: &str) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: service.to_string(),
    })
}
