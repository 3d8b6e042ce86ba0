// State management module
// Orchestrator registry, agent session and the scenario runner

pub mod agent_state;
pub mod orchestrator_state;
pub mod registry;
pub mod runner;

pub use agent_state::{AgentSession, AgentState};
pub use orchestrator_state::OrchestratorState;
pub use registry::{Agent, Registry, Scenario};
pub use runner::{LogTarget, RunnerState, RunnerStatus, ScenarioRunner, TailSettings};
