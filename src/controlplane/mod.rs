//! Clients for the coordination server and the local mesh agent.

pub mod agent;
pub mod client;
pub mod fleet;

pub use agent::AgentClient;
pub use client::{ControlPlaneClient, ControlPlaneConfig, ControlPlaneError, PreAuthKey};
pub use fleet::FleetService;
