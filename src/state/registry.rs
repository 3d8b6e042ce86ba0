// Orchestrator registry
// Known agents (name -> address) and discovered scenarios (name -> compose file)

use crate::error::AppError;
use crate::services::ScenarioService;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// A registered agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    /// Unique name chosen by the agent's operator
    pub name: String,
    /// Network address the agent registered with
    pub address: String,
}

/// A scenario discovered at startup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scenario {
    /// Unique name, the compose file's stem
    pub name: String,
    /// Compose file defining the scenario
    pub compose_file_path: PathBuf,
}

/// Registry of agents and scenarios
///
/// Agents are upserted (last write wins) and never removed. Scenarios are
/// loaded once and kept in scan order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    agents: HashMap<String, String>,
    scenarios: Vec<Scenario>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an agent's address
    /// Returns the previous address if the name was already registered
    pub fn register_agent(&mut self, name: String, address: String) -> Option<String> {
        self.agents.insert(name, address)
    }

    /// Snapshot of all agents, ordered by name
    pub fn list_agents(&self) -> BTreeMap<String, String> {
        self.agents
            .iter()
            .map(|(name, address)| (name.clone(), address.clone()))
            .collect()
    }

    /// Look up an agent by name
    pub fn find_agent(&self, name: &str) -> Result<Agent, AppError> {
        self.agents
            .get(name)
            .map(|address| Agent {
                name: name.to_string(),
                address: address.clone(),
            })
            .ok_or_else(|| AppError::AgentNotFound(name.to_string()))
    }

    /// Replace the scenario set with the compose files found in `dir`
    /// Returns the number of scenarios loaded; a missing directory loads none
    pub fn load_scenarios<P: AsRef<Path>>(&mut self, dir: P) -> usize {
        self.scenarios = ScenarioService::scan_directory(dir);
        self.scenarios.len()
    }

    /// Snapshot of all scenarios in scan order
    pub fn list_scenarios(&self) -> Vec<Scenario> {
        self.scenarios.clone()
    }

    /// Look up a scenario by name
    pub fn find_scenario(&self, name: &str) -> Result<Scenario, AppError> {
        self.scenarios
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| AppError::ScenarioNotFound(name.to_string()))
    }

    /// Get the number of registered agents
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_registry_creation() {
        let registry = Registry::new();
        assert_eq!(registry.agent_count(), 0);
        assert!(registry.list_scenarios().is_empty());
    }

    #[test]
    fn test_reregistration_last_write_wins() {
        let mut registry = Registry::new();
        assert!(registry
            .register_agent("A".to_string(), "10.0.0.1".to_string())
            .is_none());
        let previous = registry.register_agent("A".to_string(), "10.0.0.2".to_string());

        assert_eq!(previous.as_deref(), Some("10.0.0.1"));
        assert_eq!(registry.agent_count(), 1);
        assert_eq!(registry.find_agent("A").unwrap().address, "10.0.0.2");
    }

    #[test]
    fn test_list_agents_sorted() {
        let mut registry = Registry::new();
        registry.register_agent("gamma".to_string(), "10.0.0.3".to_string());
        registry.register_agent("alpha".to_string(), "10.0.0.1".to_string());

        let agents: Vec<_> = registry.list_agents().into_keys().collect();
        assert_eq!(agents, vec!["alpha", "gamma"]);
    }

    #[test]
    fn test_find_agent_not_found() {
        let registry = Registry::new();
        match registry.find_agent("ghost") {
            Err(AppError::AgentNotFound(name)) => assert_eq!(name, "ghost"),
            other => panic!("Expected AgentNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_load_scenarios_missing_directory() {
        let temp = TempDir::new().unwrap();
        let mut registry = Registry::new();
        assert_eq!(registry.load_scenarios(temp.path().join("missing")), 0);
        assert!(registry.list_scenarios().is_empty());
    }

    #[test]
    fn test_find_scenario() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("phishing.yml"), "services: {}").unwrap();

        let mut registry = Registry::new();
        assert_eq!(registry.load_scenarios(temp.path()), 1);

        let scenario = registry.find_scenario("phishing").unwrap();
        assert!(scenario.compose_file_path.ends_with("phishing.yml"));
        assert!(matches!(
            registry.find_scenario("phishing.yml"),
            Err(AppError::ScenarioNotFound(_))
        ));
    }
}
