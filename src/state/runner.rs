//! Scenario runner
//!
//! Per-agent state machine around the compose backend:
//!
//! ```text
//! Idle --start--> Starting --up ok--> Running --stop--> Stopping --> Idle
//!                    |                                     ^
//!                    +--------------up failed--------------+ (to Idle)
//! ```
//!
//! At most one scenario runs at a time. While `Running`, a tailing task
//! follows the containers' logs and ships each line to the orchestrator.
//! `stop` cancels that task before bringing the scenario down.

use crate::api::types::LogLine;
use crate::error::AppError;
use crate::executor::ScenarioBackend;
use crate::services::PeerClient;
use anyhow::anyhow;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle state of the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerState {
    /// No scenario active; `start` accepted
    Idle,
    /// `up` is in progress
    Starting,
    /// Scenario is up and its logs are being tailed
    Running,
    /// `down` is in progress
    Stopping,
}

impl RunnerState {
    /// Lowercase name used in responses and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerState::Idle => "idle",
            RunnerState::Starting => "starting",
            RunnerState::Running => "running",
            RunnerState::Stopping => "stopping",
        }
    }
}

/// Where the tailing task ships log lines
#[derive(Debug, Clone)]
pub struct LogTarget {
    /// Orchestrator base URL
    pub orchestrator: String,
    /// Name the lines are attributed to
    pub agent_name: String,
}

/// Snapshot of the runner for status endpoints
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunnerStatus {
    /// Current lifecycle state
    pub state: RunnerState,
    /// Compose file of the running scenario, if any
    pub active_scenario: Option<PathBuf>,
}

/// Timing knobs for the tailing task
#[derive(Debug, Clone, Copy)]
pub struct TailSettings {
    /// Delay before following logs
    pub grace: Duration,
    /// Timeout for delivering one line
    pub delivery_timeout: Duration,
}

struct ActiveScenario {
    compose_file: PathBuf,
    cancel: CancellationToken,
    tail: JoinHandle<()>,
}

struct RunnerInner {
    state: RunnerState,
    // Some exactly while Running
    active: Option<ActiveScenario>,
}

/// Starts and stops one scenario at a time
pub struct ScenarioRunner {
    backend: Arc<dyn ScenarioBackend>,
    client: PeerClient,
    tail: TailSettings,
    inner: Mutex<RunnerInner>,
}

impl ScenarioRunner {
    /// Create an idle runner
    pub fn new(backend: Arc<dyn ScenarioBackend>, client: PeerClient, tail: TailSettings) -> Self {
        Self {
            backend,
            client,
            tail,
            inner: Mutex::new(RunnerInner {
                state: RunnerState::Idle,
                active: None,
            }),
        }
    }

    /// Current state and active compose file
    pub async fn status(&self) -> RunnerStatus {
        let inner = self.inner.lock().await;
        RunnerStatus {
            state: inner.state,
            active_scenario: inner.active.as_ref().map(|a| a.compose_file.clone()),
        }
    }

    /// Bring up the scenario in `compose_file` and start tailing its logs
    ///
    /// The path is resolved to an absolute one first; that form is what the
    /// backend sees and what [`status`](Self::status) reports. Lines are
    /// shipped to `target` when given, otherwise only logged locally. The
    /// compose command runs on a detached task so a dropped request cannot
    /// leave the runner stuck in `Starting`.
    pub async fn start(
        self: &Arc<Self>,
        compose_file: &Path,
        target: Option<LogTarget>,
    ) -> Result<(), AppError> {
        // Compose runs from the file's directory, so hand it an absolute path
        let compose_file = tokio::fs::canonicalize(compose_file)
            .await
            .map_err(|_| AppError::ComposeFileNotFound(compose_file.display().to_string()))?;

        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                RunnerState::Idle => inner.state = RunnerState::Starting,
                RunnerState::Running => {
                    let active = inner
                        .active
                        .as_ref()
                        .map(|a| a.compose_file.display().to_string())
                        .unwrap_or_default();
                    return Err(AppError::ScenarioAlreadyRunning(active));
                }
                other => return Err(AppError::RunnerBusy(other.as_str().to_string())),
            }
        }

        info!(compose_file = %compose_file.display(), "Starting scenario");

        let runner = Arc::clone(self);
        tokio::spawn(async move { runner.bring_up(compose_file, target).await })
            .await
            .map_err(|e| AppError::Internal(anyhow!("Scenario start task failed: {}", e)))?
    }

    async fn bring_up(
        &self,
        compose_file: PathBuf,
        target: Option<LogTarget>,
    ) -> Result<(), AppError> {
        if let Err(e) = self.backend.up(&compose_file).await {
            error!(
                compose_file = %compose_file.display(),
                error = %e,
                "Scenario failed to start"
            );
            self.inner.lock().await.state = RunnerState::Idle;
            return Err(AppError::Fatal(e));
        }

        let cancel = CancellationToken::new();
        let tail = tokio::spawn(tail_logs(
            Arc::clone(&self.backend),
            self.client.clone(),
            compose_file.clone(),
            target,
            self.tail,
            cancel.clone(),
        ));

        let mut inner = self.inner.lock().await;
        inner.state = RunnerState::Running;
        inner.active = Some(ActiveScenario {
            compose_file: compose_file.clone(),
            cancel,
            tail,
        });

        info!(compose_file = %compose_file.display(), "Scenario running");
        Ok(())
    }

    /// Stop the running scenario
    ///
    /// Log tailing is cancelled first. The runner returns to `Idle` even when
    /// the down command fails, so a new scenario can always be started;
    /// the failure is still reported. Returns the compose file that was
    /// stopped.
    pub async fn stop(self: &Arc<Self>) -> Result<PathBuf, AppError> {
        let active = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                RunnerState::Running => {
                    inner.state = RunnerState::Stopping;
                    inner.active.take()
                }
                RunnerState::Idle => return Err(AppError::NoScenarioRunning),
                other => return Err(AppError::RunnerBusy(other.as_str().to_string())),
            }
        };

        let Some(active) = active else {
            self.inner.lock().await.state = RunnerState::Idle;
            return Err(AppError::Internal(anyhow!(
                "Runner was running without an active scenario"
            )));
        };

        info!(compose_file = %active.compose_file.display(), "Stopping scenario");

        active.cancel.cancel();
        if let Err(e) = active.tail.await {
            warn!(error = %e, "Log tailing task ended abnormally");
        }

        let runner = Arc::clone(self);
        let compose_file = active.compose_file;
        tokio::spawn(async move {
            let result = runner.backend.down(&compose_file).await;
            runner.inner.lock().await.state = RunnerState::Idle;
            match result {
                Ok(()) => {
                    info!(compose_file = %compose_file.display(), "Scenario stopped");
                    Ok(compose_file)
                }
                Err(e) => {
                    error!(
                        compose_file = %compose_file.display(),
                        error = %e,
                        "Scenario down command failed, state cleared anyway"
                    );
                    Err(AppError::Fatal(e))
                }
            }
        })
        .await
        .map_err(|e| AppError::Internal(anyhow!("Scenario stop task failed: {}", e)))?
    }
}

/// Follow the scenario's logs and forward every line until cancelled or the
/// follower exits. Delivery failures are logged and skipped.
async fn tail_logs(
    backend: Arc<dyn ScenarioBackend>,
    client: PeerClient,
    compose_file: PathBuf,
    target: Option<LogTarget>,
    settings: TailSettings,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(settings.grace) => {}
    }

    let mut lines = match backend.follow_logs(&compose_file).await {
        Ok(lines) => lines,
        Err(e) => {
            warn!(
                compose_file = %compose_file.display(),
                error = %e,
                "Could not follow scenario logs"
            );
            return;
        }
    };

    let mut shipped = 0usize;
    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        let Some(target) = &target else {
            debug!(line = %line, "Not connected to an orchestrator, line not shipped");
            continue;
        };

        let log = LogLine {
            agent_name: target.agent_name.clone(),
            log_line: line,
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = client.send_log(&target.orchestrator, &log, settings.delivery_timeout) => {
                match result {
                    Ok(()) => shipped += 1,
                    Err(e) => warn!(error = %e, "Failed to deliver log line"),
                }
            }
        }
    }

    info!(
        compose_file = %compose_file.display(),
        shipped = shipped,
        "Log tailing stopped"
    );
}
