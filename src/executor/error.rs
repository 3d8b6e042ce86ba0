//! Execution-specific error types
//!
//! Errors raised while driving the external compose CLI.

use thiserror::Error;

/// Errors that can occur while running a compose command
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// Process exited with a non-zero code; carries the captured stderr
    #[error("Process execution failed: {0}")]
    ProcessFailed(String),

    /// Failed to spawn the process (e.g., command not found, permission denied)
    #[error("Failed to spawn process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    /// No compose program was configured
    #[error("Command not found: {0}")]
    CommandNotFound(String),
}
