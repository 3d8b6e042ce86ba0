//! LISE - Local Incident Simulation Environment
//!
//! An orchestrator tracks registered agents and the scenarios it can offer,
//! and tells agents to start or stop a compose-defined scenario. Agents ship
//! container logs back, and the orchestrator relays them to browser viewers
//! over a WebSocket.
//!
//! The binaries are in `src/bin/`.

pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod server;
pub mod services;
/// Application state management
///
/// Registry, agent session and the scenario runner.
pub mod state;
pub mod websocket;
