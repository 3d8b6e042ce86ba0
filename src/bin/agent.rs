//! LISE Agent
//!
//! Runs on a participant machine: registers with the orchestrator and
//! starts/stops one compose scenario at a time on its command.

use anyhow::Context;
use lise::config::AgentConfig;
use lise::executor::ComposeExecutor;
use lise::state::AgentState;
use lise::{api, server};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::init_tracing();

    let config = AgentConfig::from_env();
    info!("Configuration loaded: {:?}", config);

    let backend = ComposeExecutor::new(&config.compose_command)
        .context("Invalid COMPOSE_COMMAND")?;

    let addr = config.server.addr();
    let app = api::agent::router(AgentState::new(config, Arc::new(backend)));

    server::serve(app, &addr, "Agent").await
}
