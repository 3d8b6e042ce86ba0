//! Integration tests for the orchestrator <-> agent flow
//!
//! Both routers are served on ephemeral ports; the agent runs against an
//! in-memory compose backend so no container runtime is needed.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use lise::api;
use lise::config::{AgentConfig, OrchestratorConfig};
use lise::executor::{ExecutionError, ScenarioBackend};
use lise::state::{AgentState, OrchestratorState, Registry, RunnerState};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Records compose invocations and emits canned log lines
#[derive(Default)]
struct RecordingBackend {
    started: Mutex<Vec<PathBuf>>,
    stopped: Mutex<Vec<PathBuf>>,
    lines: Vec<String>,
}

#[async_trait]
impl ScenarioBackend for RecordingBackend {
    async fn up(&self, compose_file: &Path) -> Result<(), ExecutionError> {
        self.started.lock().unwrap().push(compose_file.to_path_buf());
        Ok(())
    }

    async fn down(&self, compose_file: &Path) -> Result<(), ExecutionError> {
        self.stopped.lock().unwrap().push(compose_file.to_path_buf());
        Ok(())
    }

    async fn follow_logs(
        &self,
        _compose_file: &Path,
    ) -> Result<mpsc::Receiver<String>, ExecutionError> {
        let (tx, rx) = mpsc::channel(16);
        for line in &self.lines {
            tx.send(line.clone()).await.unwrap();
        }
        Ok(rx)
    }
}

/// Serve `app` on an ephemeral loopback port and return its base URL
async fn spawn_server(app: axum::Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Orchestrator with one scenario `S` discovered from a temp directory
async fn spawn_orchestrator(scenarios: &TempDir) -> (OrchestratorState, String) {
    std::fs::write(scenarios.path().join("S.yml"), "services: {}").unwrap();
    let mut registry = Registry::new();
    assert_eq!(registry.load_scenarios(scenarios.path()), 1);

    let state = OrchestratorState::new(OrchestratorConfig::default(), registry);
    let url = spawn_server(api::orchestrator::router(state.clone())).await;
    (state, url)
}

async fn spawn_agent(backend: Arc<RecordingBackend>) -> (AgentState, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = AgentConfig {
        log_grace: Duration::ZERO,
        advertise_address: Some(addr.to_string()),
        ..AgentConfig::default()
    };
    let state = AgentState::new(config, backend);
    let app = api::agent::router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, format!("http://{}", addr))
}

/// Poll `condition` for up to two seconds
async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test]
async fn test_register_list_dispatch_start() {
    let scenarios = TempDir::new().unwrap();
    let (_orchestrator, orchestrator_url) = spawn_orchestrator(&scenarios).await;
    let backend = Arc::new(RecordingBackend::default());
    let (agent, agent_url) = spawn_agent(backend.clone()).await;
    let client = reqwest::Client::new();

    // Register "A" at the agent's address
    let agent_addr = agent_url.trim_start_matches("http://").to_string();
    let response = client
        .post(format!("{}/api/agents/register", orchestrator_url))
        .json(&json!({ "display_name": "A", "ip_address": agent_addr }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let agents: Value = client
        .get(format!("{}/api/agents", orchestrator_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(agents, json!({ "agents": { "A": agent_addr } }));

    let scenarios_list: Value = client
        .get(format!("{}/api/scenarios", orchestrator_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(scenarios_list["scenarios"][0]["name"], "S");

    // Dispatch start of "S" to "A"
    let response = client
        .post(format!("{}/api/simulation/start", orchestrator_url))
        .json(&json!({ "agent_name": "A", "scenario_name": "S" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");

    let expected = scenarios.path().join("S.yml").canonicalize().unwrap();
    assert_eq!(*backend.started.lock().unwrap(), vec![expected]);
    assert_eq!(agent.runner.status().await.state, RunnerState::Running);
}

#[tokio::test]
async fn test_dispatch_errors_map_to_status_codes() {
    let scenarios = TempDir::new().unwrap();
    let (orchestrator, orchestrator_url) = spawn_orchestrator(&scenarios).await;
    let backend = Arc::new(RecordingBackend::default());
    let (_agent, agent_url) = spawn_agent(backend).await;
    let client = reqwest::Client::new();

    let unknown = client
        .post(format!("{}/api/simulation/start", orchestrator_url))
        .json(&json!({ "agent_name": "ghost", "scenario_name": "S" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 404);

    orchestrator
        .registry
        .write()
        .await
        .register_agent("A".to_string(), agent_url);

    // Stop with nothing running: agent answers 400, orchestrator reports upstream failure
    let stop = client
        .post(format!("{}/api/simulation/stop", orchestrator_url))
        .json(&json!({ "agent_name": "A" }))
        .send()
        .await
        .unwrap();
    assert_eq!(stop.status(), 502);
    let body: Value = stop.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("No scenario is currently running"));
}

#[tokio::test]
async fn test_agent_logs_reach_viewers() {
    let scenarios = TempDir::new().unwrap();
    let (orchestrator, orchestrator_url) = spawn_orchestrator(&scenarios).await;
    let backend = Arc::new(RecordingBackend {
        lines: vec!["web_1 | GET /login 200".to_string()],
        ..Default::default()
    });
    let (agent, _agent_url) = spawn_agent(backend.clone()).await;

    let (_viewer_id, mut viewer) = orchestrator.relay.connect();

    agent.connect("lab-01", &orchestrator_url).await.unwrap();
    assert_eq!(orchestrator.registry.read().await.agent_count(), 1);

    let compose = scenarios.path().join("S.yml");
    let target = agent.session.read().await.log_target();
    agent.runner.start(&compose, target).await.unwrap();

    let line = tokio::time::timeout(Duration::from_secs(5), viewer.recv())
        .await
        .expect("log line should be relayed")
        .unwrap();
    assert_eq!(line, "[lab-01] web_1 | GET /login 200");

    let stopped = agent.runner.stop().await.unwrap();
    let canonical = compose.canonicalize().unwrap();
    assert_eq!(stopped, canonical);
    assert_eq!(*backend.stopped.lock().unwrap(), vec![canonical]);
}

#[tokio::test]
async fn test_agent_start_status_codes() {
    let backend = Arc::new(RecordingBackend::default());
    let (_agent, agent_url) = spawn_agent(backend).await;
    let client = reqwest::Client::new();

    let missing = client
        .post(format!("{}/api/scenario/start", agent_url))
        .json(&json!({ "compose_file_path": "/nonexistent/lab.yml" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    let scenarios = TempDir::new().unwrap();
    let compose = scenarios.path().join("lab.yml");
    std::fs::write(&compose, "services: {}").unwrap();
    let request = json!({ "compose_file_path": compose.to_string_lossy() });

    let first = client
        .post(format!("{}/api/scenario/start", agent_url))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    let second = client
        .post(format!("{}/api/scenario/start", agent_url))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 400);
}

#[tokio::test]
async fn test_log_stream_socket_receives_lines_until_closed() {
    let scenarios = TempDir::new().unwrap();
    let (orchestrator, orchestrator_url) = spawn_orchestrator(&scenarios).await;
    let ws_url = format!(
        "{}/ws/log-stream",
        orchestrator_url.replacen("http://", "ws://", 1)
    );

    let (mut first, _) = connect_async(ws_url.as_str()).await.unwrap();
    let (mut second, _) = connect_async(ws_url.as_str()).await.unwrap();
    assert!(wait_until(|| orchestrator.relay.viewer_count() == 2).await);

    let response = reqwest::Client::new()
        .post(format!("{}/api/log", orchestrator_url))
        .json(&json!({ "agent_name": "lab-01", "log_line": "db_1 | ready" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["status"], "log received");

    for socket in [&mut first, &mut second] {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("frame should arrive")
            .unwrap()
            .unwrap();
        assert_eq!(frame, Message::Text("[lab-01] db_1 | ready".to_string()));
    }

    first.close(None).await.unwrap();
    assert!(wait_until(|| orchestrator.relay.viewer_count() == 1).await);

    second.close(None).await.unwrap();
    assert!(wait_until(|| orchestrator.relay.viewer_count() == 0).await);
}
