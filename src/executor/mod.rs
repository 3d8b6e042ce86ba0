//! Scenario execution module
//!
//! Wraps the external container-orchestration CLI. The runner only talks to
//! it through [`ScenarioBackend`], so the compose binary can be swapped (or
//! faked in tests) without touching the state machine.

pub mod cli;
pub mod error;
pub mod streaming;

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

pub use cli::ComposeExecutor;
pub use error::ExecutionError;

/// Operations the scenario runner needs from a container backend
#[async_trait]
pub trait ScenarioBackend: Send + Sync {
    /// Bring the scenario up in detached mode; blocks until the command exits
    async fn up(&self, compose_file: &Path) -> Result<(), ExecutionError>;

    /// Bring the scenario down; blocks until the command exits
    async fn down(&self, compose_file: &Path) -> Result<(), ExecutionError>;

    /// Follow container logs, yielding one line per message
    ///
    /// The stream ends when the underlying follower exits. Dropping the
    /// receiver stops the follower.
    async fn follow_logs(
        &self,
        compose_file: &Path,
    ) -> Result<mpsc::Receiver<String>, ExecutionError>;
}
