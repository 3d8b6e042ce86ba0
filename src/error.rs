//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Variants group into four kinds: not found, conflict, upstream failure and
/// fatal command failure. None of them are retried.
#[derive(Error, Debug)]
pub enum AppError {
    /// No agent registered under the given name
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// No scenario discovered under the given name
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    /// Compose file does not exist on this machine
    #[error("Compose file not found: {0}")]
    ComposeFileNotFound(String),

    /// A scenario is already active on this agent
    #[error("A scenario is already running: {0}")]
    ScenarioAlreadyRunning(String),

    /// Stop was requested but nothing is running
    #[error("No scenario is currently running")]
    NoScenarioRunning,

    /// The runner is in the middle of starting or stopping
    #[error("Scenario runner is busy ({0})")]
    RunnerBusy(String),

    /// Request body is well-formed JSON but semantically invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A peer service was unreachable or answered with a non-2xx status
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The external compose command failed
    #[error("Scenario command failed: {0}")]
    Fatal(#[from] crate::executor::ExecutionError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ScenarioNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ComposeFileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ScenarioAlreadyRunning(_) => StatusCode::BAD_REQUEST,
            AppError::NoScenarioRunning => StatusCode::BAD_REQUEST,
            AppError::RunnerBusy(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "status": "error",
            "message": self.to_string(),
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionError;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::AgentNotFound("a".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::ComposeFileNotFound("/x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::NoScenarioRunning.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Upstream("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(ExecutionError::ProcessFailed("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_carries_detail() {
        let response = AppError::Fatal(ExecutionError::ProcessFailed(
            "Process exited with code 1: no such service".into(),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], 500);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("no such service"));
    }
}
