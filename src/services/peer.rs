//! Peer HTTP client
//!
//! Outbound calls between the two services: agent registration and log
//! delivery (agent → orchestrator) and scenario commands (orchestrator →
//! agent). Every call carries its own timeout and none are retried.

use crate::api::types::{LogLine, RegisterAgentRequest, StartScenarioRequest};
use crate::error::AppError;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Turn a peer address into a base URL
///
/// Accepts a bare host (`10.0.0.5`), `host:port`, or a full URL. Bare hosts
/// get `default_port`.
pub fn base_url(address: &str, default_port: u16) -> String {
    let address = address.trim().trim_end_matches('/');
    if address.contains("://") {
        return address.to_string();
    }

    let has_port = match address.rsplit_once(':') {
        // Bracketed IPv6 with a port: `[::1]:8000`
        Some((host, port)) if host.ends_with(']') || !host.contains(':') => {
            port.parse::<u16>().is_ok()
        }
        _ => false,
    };

    if has_port {
        format!("http://{}", address)
    } else if address.contains(':') && !address.starts_with('[') {
        // Bare IPv6
        format!("http://[{}]:{}", address, default_port)
    } else {
        format!("http://{}:{}", address, default_port)
    }
}

/// HTTP client for calls to the other service
#[derive(Debug, Clone, Default)]
pub struct PeerClient {
    client: reqwest::Client,
}

impl PeerClient {
    /// Create a client with connection pooling
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent with the orchestrator at `orchestrator`
    pub async fn register(
        &self,
        orchestrator: &str,
        request: &RegisterAgentRequest,
        timeout: Duration,
    ) -> Result<Value, AppError> {
        let url = format!("{}/api/agents/register", orchestrator);
        self.post_json(&url, Some(request), timeout).await
    }

    /// Deliver one log line to the orchestrator
    pub async fn send_log(
        &self,
        orchestrator: &str,
        line: &LogLine,
        timeout: Duration,
    ) -> Result<(), AppError> {
        let url = format!("{}/api/log", orchestrator);
        self.post_json(&url, Some(line), timeout).await.map(|_| ())
    }

    /// Ask the agent at `agent` to start the scenario in `compose_file_path`
    pub async fn start_scenario(
        &self,
        agent: &str,
        compose_file_path: &str,
        timeout: Duration,
    ) -> Result<Value, AppError> {
        let url = format!("{}/api/scenario/start", agent);
        let request = StartScenarioRequest {
            compose_file_path: compose_file_path.to_string(),
        };
        self.post_json(&url, Some(&request), timeout).await
    }

    /// Ask the agent at `agent` to stop its running scenario
    pub async fn stop_scenario(&self, agent: &str, timeout: Duration) -> Result<Value, AppError> {
        let url = format!("{}/api/scenario/stop", agent);
        self.post_json::<()>(&url, None, timeout).await
    }

    async fn post_json<T: Serialize>(
        &self,
        url: &str,
        body: Option<&T>,
        timeout: Duration,
    ) -> Result<Value, AppError> {
        debug!(url = %url, timeout_ms = timeout.as_millis(), "Calling peer");

        let mut request = self.client.post(url).timeout(timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to reach {}: {}", url, e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let detail = error_detail(&text);
            error!(
                url = %url,
                status_code = status.as_u16(),
                detail = %detail,
                "Peer returned error status"
            );
            return Err(AppError::Upstream(format!(
                "{} returned {}: {}",
                url,
                status.as_u16(),
                detail
            )));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| AppError::Upstream(format!("Invalid JSON from {}: {}", url, e)))
    }
}

/// Pull the human-readable detail out of a peer's error body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "detail", "error"]
                .iter()
                .find_map(|key| json.get(key).and_then(Value::as_str).map(String::from))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serial_test::serial;

    #[test]
    fn test_base_url_forms() {
        assert_eq!(base_url("10.0.0.5", 8080), "http://10.0.0.5:8080");
        assert_eq!(base_url("10.0.0.5:9000", 8080), "http://10.0.0.5:9000");
        assert_eq!(base_url("lab-host", 8000), "http://lab-host:8000");
        assert_eq!(
            base_url("http://127.0.0.1:4321/", 8080),
            "http://127.0.0.1:4321"
        );
        assert_eq!(base_url("[::1]:9000", 8080), "http://[::1]:9000");
        assert_eq!(base_url("::1", 8080), "http://[::1]:8080");
    }

    #[test]
    fn test_error_detail_prefers_message() {
        assert_eq!(
            error_detail(r#"{"status":"error","message":"already running"}"#),
            "already running"
        );
        assert_eq!(error_detail(r#"{"detail":"not found"}"#), "not found");
        assert_eq!(error_detail("gateway down\n"), "gateway down");
    }

    #[tokio::test]
    #[serial]
    async fn test_start_scenario_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/scenario/start")
            .match_body(Matcher::Json(serde_json::json!({
                "compose_file_path": "/srv/scenarios/dos.yml"
            })))
            .with_status(200)
            .with_body(r#"{"status":"success","message":"Scenario started"}"#)
            .create_async()
            .await;

        let client = PeerClient::new();
        let result = client
            .start_scenario(&server.url(), "/srv/scenarios/dos.yml", Duration::from_secs(2))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result["status"], "success");
    }

    #[tokio::test]
    #[serial]
    async fn test_non_2xx_is_upstream_with_detail() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/scenario/stop")
            .with_status(400)
            .with_body(r#"{"status":"error","message":"No scenario is currently running","code":400}"#)
            .create_async()
            .await;

        let client = PeerClient::new();
        let result = client
            .stop_scenario(&server.url(), Duration::from_secs(2))
            .await;

        mock.assert_async().await;
        match result {
            Err(AppError::Upstream(detail)) => {
                assert!(detail.contains("400"));
                assert!(detail.contains("No scenario is currently running"));
            }
            other => panic!("Expected Upstream error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_upstream() {
        let client = PeerClient::new();
        // Port 9 (discard) on loopback is almost never listening
        let result = client
            .send_log(
                "http://127.0.0.1:9",
                &LogLine {
                    agent_name: "a".to_string(),
                    log_line: "x".to_string(),
                },
                Duration::from_millis(500),
            )
            .await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
    }
}
