//! Compose CLI executor implementation
//!
//! Runs `up`/`down` against a compose file by spawning the configured
//! compose program and capturing its output.

use crate::executor::error::ExecutionError;
use crate::executor::ScenarioBackend;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Executor for the external compose program
#[derive(Debug, Clone)]
pub struct ComposeExecutor {
    /// Program to spawn (e.g. `docker`)
    program: String,
    /// Arguments placed before the compose file flag (e.g. `compose`)
    base_args: Vec<String>,
}

impl ComposeExecutor {
    /// Create an executor from a command line such as `["docker", "compose"]`
    pub fn new(command: &[String]) -> Result<Self, ExecutionError> {
        let (program, base_args) = command
            .split_first()
            .ok_or_else(|| ExecutionError::CommandNotFound("empty compose command".to_string()))?;

        Ok(Self {
            program: program.clone(),
            base_args: base_args.to_vec(),
        })
    }

    /// Build a command for `action` against `compose_file`
    ///
    /// Runs from the compose file's directory so relative build contexts and
    /// env files resolve the same way they do from a shell.
    pub(crate) fn command(&self, compose_file: &Path, action: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .arg("-f")
            .arg(compose_file)
            .args(action)
            .stdin(Stdio::null());

        if let Some(dir) = compose_file.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }

        cmd
    }

    /// Run `action` to completion and return its stdout
    async fn run(&self, compose_file: &Path, action: &[&str]) -> Result<String, ExecutionError> {
        debug!(
            program = %self.program,
            base_args = ?self.base_args,
            action = ?action,
            compose_file = %compose_file.display(),
            "Spawning compose command"
        );

        let output = self
            .command(compose_file, action)
            .output()
            .await
            .map_err(|e| {
                error!(
                    program = %self.program,
                    error = %e,
                    "Failed to spawn compose command"
                );
                ExecutionError::SpawnFailed(e)
            })?;

        if output.status.success() {
            // Exit status decides success; stdout is informational only
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            info!(
                action = ?action,
                compose_file = %compose_file.display(),
                "Compose command finished"
            );
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);

            error!(
                action = ?action,
                exit_code = exit_code,
                stderr = %stderr,
                "Compose command failed"
            );

            Err(ExecutionError::ProcessFailed(format!(
                "Process exited with code {}: {}",
                exit_code,
                stderr.trim()
            )))
        }
    }
}

#[async_trait]
impl ScenarioBackend for ComposeExecutor {
    async fn up(&self, compose_file: &Path) -> Result<(), ExecutionError> {
        self.run(compose_file, &["up", "-d"]).await.map(|_| ())
    }

    async fn down(&self, compose_file: &Path) -> Result<(), ExecutionError> {
        self.run(compose_file, &["down"]).await.map(|_| ())
    }

    async fn follow_logs(
        &self,
        compose_file: &Path,
    ) -> Result<mpsc::Receiver<String>, ExecutionError> {
        self.follow(compose_file).await
    }
}
