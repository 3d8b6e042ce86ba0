//! Log relay and viewer WebSocket
//!
//! The relay fans log lines out to every connected viewer. There is no
//! replay: a viewer only sees lines broadcast while it is connected. Each
//! viewer has a bounded queue; a viewer whose queue is full or whose channel
//! is gone is dropped on the next broadcast. Supports ping/pong for
//! connection keepalive.

use crate::state::OrchestratorState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Identifier handed to a viewer on connect
pub type ViewerId = Uuid;

/// Lines a viewer may have queued before it is considered stalled
pub const VIEWER_BUFFER: usize = 256;

type ViewerMap = HashMap<ViewerId, mpsc::Sender<String>>;

/// One-to-many broadcast hub for log lines
#[derive(Clone, Default)]
pub struct LogRelay {
    viewers: Arc<Mutex<ViewerMap>>,
}

impl LogRelay {
    /// Create a relay with no viewers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a viewer; it receives every line broadcast until it disconnects
    pub fn connect(&self) -> (ViewerId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(VIEWER_BUFFER);
        let id = Uuid::new_v4();
        self.lock().insert(id, tx);
        debug!(viewer_id = %id, "Viewer connected");
        (id, rx)
    }

    /// Remove a viewer; no-op if it is already gone
    pub fn disconnect(&self, id: &ViewerId) {
        if self.lock().remove(id).is_some() {
            debug!(viewer_id = %id, "Viewer disconnected");
        }
    }

    /// Send `line` to every connected viewer
    ///
    /// Never blocks on a slow viewer. Viewers that are gone or have fallen
    /// [`VIEWER_BUFFER`] lines behind are removed; the rest still get the
    /// line. Returns the number of viewers the line was delivered to.
    pub fn broadcast(&self, line: &str) -> usize {
        let mut viewers = self.lock();
        viewers.retain(|id, tx| match tx.try_send(line.to_string()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(viewer_id = %id, "Dropping stalled viewer");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(viewer_id = %id, "Dropping unreachable viewer");
                false
            }
        });
        viewers.len()
    }

    /// Get the number of connected viewers
    pub fn viewer_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ViewerMap> {
        self.viewers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// WebSocket upgrade handler for `/ws/log-stream`
pub async fn log_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<OrchestratorState>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state.relay))
}

// Forward relay lines to one viewer socket until either side goes away
async fn handle_socket(socket: WebSocket, relay: LogRelay) {
    let (mut sender, mut receiver) = socket.split();
    let (viewer_id, mut lines) = relay.connect();

    info!(viewer_id = %viewer_id, "Log viewer connected");

    // Merges relay lines and keepalive pings into the single socket sink
    let (tx, mut rx) = mpsc::channel::<Message>(VIEWER_BUFFER);

    // Blocks when the socket is slow, which backs up into the relay queue
    let line_tx = tx.clone();
    let mut forward_task = tokio::spawn(async move {
        while let Some(line) = lines.recv().await {
            if line_tx.send(Message::Text(line)).await.is_err() {
                break;
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
    });

    let ping_tx = tx;
    let mut ping_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;
            if ping_tx.send(Message::Ping(vec![])).await.is_err() {
                break;
            }
        }
    });

    // Viewers only listen; inbound text is ignored
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {}
        _ = &mut ping_task => {}
        _ = &mut recv_task => {}
        _ = &mut forward_task => {}
    }
    send_task.abort();
    ping_task.abort();
    recv_task.abort();
    forward_task.abort();

    relay.disconnect(&viewer_id);
    info!(viewer_id = %viewer_id, "Log viewer disconnected");
}
