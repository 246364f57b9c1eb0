//! Application State
//!
//! Shared state accessible by all handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::controlplane::{ControlPlaneClient, FleetService};
use crate::events::Broker;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Combined control-plane/agent view of the fleet
    pub fleet: Arc<FleetService>,
    /// Raw control plane client for mutating actions
    pub control: Arc<ControlPlaneClient>,
    /// Fan-out hub for the live event stream
    pub broker: Arc<Broker>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        fleet: Arc<FleetService>,
        control: Arc<ControlPlaneClient>,
        broker: Arc<Broker>,
        config: ServerConfig,
    ) -> Self {
        Self {
            fleet,
            control,
            broker,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// Console server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Optional bearer token required on every request
    pub auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            auth_token: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
