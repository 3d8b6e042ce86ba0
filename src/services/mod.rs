//! Services module
//!
//! Filesystem, network and peer-HTTP helpers used by both services.

pub mod network;
pub mod peer;
pub mod scenarios;

pub use peer::PeerClient;
pub use scenarios::ScenarioService;
