//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. The orchestrator and the agent each read their own
//! section; both share the server settings.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default port the orchestrator listens on
pub const DEFAULT_ORCHESTRATOR_PORT: u16 = 8080;
/// Default port an agent listens on
pub const DEFAULT_AGENT_PORT: u16 = 8000;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

impl ServerConfig {
    fn from_env(default_port: u16) -> Self {
        Self {
            port: env_parse("PORT").unwrap_or(default_port),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
        }
    }

    /// Get the server address as a string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Directory scanned once at startup for compose files
    pub scenarios_dir: PathBuf,
    /// Port assumed for agents that registered with a bare IP
    pub agent_port: u16,
    /// Bound on start/stop commands sent to agents
    pub dispatch_timeout: Duration,
}

impl OrchestratorConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(DEFAULT_ORCHESTRATOR_PORT),
            scenarios_dir: env::var("SCENARIOS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("scenarios")),
            agent_port: env_parse("AGENT_PORT").unwrap_or(DEFAULT_AGENT_PORT),
            dispatch_timeout: Duration::from_secs(
                env_parse("DISPATCH_TIMEOUT_SECS").unwrap_or(120),
            ),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: DEFAULT_ORCHESTRATOR_PORT,
                host: "0.0.0.0".to_string(),
            },
            scenarios_dir: PathBuf::from("scenarios"),
            agent_port: DEFAULT_AGENT_PORT,
            dispatch_timeout: Duration::from_secs(120),
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Port assumed when the orchestrator was given as a bare IP
    pub orchestrator_port: u16,
    /// Compose program followed by its leading arguments (e.g. `docker compose`)
    pub compose_command: Vec<String>,
    /// Delay before following container logs, lets containers initialize
    pub log_grace: Duration,
    /// Timeout for delivering one log line to the orchestrator
    pub log_delivery_timeout: Duration,
    /// Timeout for the registration call
    pub register_timeout: Duration,
    /// Address advertised on registration instead of the discovered one
    pub advertise_address: Option<String>,
}

impl AgentConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServerConfig::from_env(DEFAULT_AGENT_PORT),
            orchestrator_port: env_parse("ORCHESTRATOR_PORT").unwrap_or(defaults.orchestrator_port),
            compose_command: env::var("COMPOSE_COMMAND")
                .ok()
                .map(|c| c.split_whitespace().map(String::from).collect::<Vec<_>>())
                .filter(|parts| !parts.is_empty())
                .unwrap_or(defaults.compose_command),
            log_grace: env_parse("LOG_GRACE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.log_grace),
            log_delivery_timeout: env_parse("LOG_DELIVERY_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.log_delivery_timeout),
            register_timeout: env_parse("REGISTER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.register_timeout),
            advertise_address: env::var("ADVERTISE_ADDRESS")
                .ok()
                .filter(|a| !a.trim().is_empty()),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: DEFAULT_AGENT_PORT,
                host: "0.0.0.0".to_string(),
            },
            orchestrator_port: DEFAULT_ORCHESTRATOR_PORT,
            compose_command: vec!["docker".to_string(), "compose".to_string()],
            log_grace: Duration::from_secs(5),
            log_delivery_timeout: Duration::from_secs(2),
            register_timeout: Duration::from_secs(5),
            advertise_address: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
