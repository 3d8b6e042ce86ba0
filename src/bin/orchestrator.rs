//! LISE Orchestrator
//!
//! Central command server: tracks agents, lists scenarios, dispatches
//! start/stop commands and relays scenario logs to viewers.

use lise::config::OrchestratorConfig;
use lise::state::{OrchestratorState, Registry};
use lise::{api, server};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::init_tracing();

    let config = OrchestratorConfig::from_env();
    info!("Configuration loaded: {:?}", config);

    let mut registry = Registry::new();
    let count = registry.load_scenarios(&config.scenarios_dir);
    info!(
        "Loaded {} scenarios from {}",
        count,
        config.scenarios_dir.display()
    );

    let addr = config.server.addr();
    let app = api::orchestrator::router(OrchestratorState::new(config, registry));

    server::serve(app, &addr, "Orchestrator").await
}
