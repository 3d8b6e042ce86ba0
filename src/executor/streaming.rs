//! Streaming log follower
//!
//! Spawns `logs -f` for a compose file and streams its output line-by-line.

use crate::executor::cli::ComposeExecutor;
use crate::executor::error::ExecutionError;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Capacity of the line channel between the follower and its consumer
const LINE_BUFFER: usize = 100;

impl ComposeExecutor {
    /// Follow the scenario's container logs
    ///
    /// Returns a channel receiver that yields lines as they come. The
    /// follower process is killed once the receiver is dropped.
    pub async fn follow(
        &self,
        compose_file: &Path,
    ) -> Result<mpsc::Receiver<String>, ExecutionError> {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);

        let mut cmd = self.command(compose_file, &["logs", "-f", "--no-color"]);
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(ExecutionError::SpawnFailed)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutionError::ProcessFailed("Failed to capture stdout".to_string()))?;

        info!(
            compose_file = %compose_file.display(),
            "Following scenario logs"
        );

        let mut reader = BufReader::new(stdout);
        let compose_file = compose_file.to_path_buf();

        tokio::spawn(async move {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let read = tokio::select! {
                    _ = tx.closed() => {
                        debug!("Log consumer dropped, stopping follower");
                        break;
                    }
                    read = reader.read_until(b'\n', &mut buf) => read,
                };

                match read {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.send(decode_line(&buf)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read log output");
                        break;
                    }
                }
            }

            // No-op when the follower already exited on its own
            let _ = child.kill().await;
            info!(
                compose_file = %compose_file.display(),
                "Log follower exited"
            );
        });

        Ok(rx)
    }
}

// Container output is not guaranteed UTF-8; invalid bytes become U+FFFD
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
