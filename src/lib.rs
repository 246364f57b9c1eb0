//! # Fleetdeck
//!
//! Web admin console for a mesh VPN control plane: server-rendered pages
//! over the coordination server's admin API, kept live by a polling
//! change-detection pipeline that pushes re-rendered table fragments to
//! browsers over server-sent events.
//!
//! ## Modules
//!
//! - [`controlplane`]: clients for the coordination server and local agent
//! - [`events`]: broker, poller, and change detection for live updates
//! - [`models`]: display-oriented machine and user projections
//! - [`render`]: HTML pages and the table fragments the stream carries
//! - [`api`]: console HTTP server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fleetdeck::api::{serve, AppState, ServerConfig};
//! use fleetdeck::controlplane::{ControlPlaneClient, ControlPlaneConfig, FleetService};
//! use fleetdeck::events::Broker;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let control = Arc::new(ControlPlaneClient::new(ControlPlaneConfig::default()));
//!     let fleet = Arc::new(FleetService::new(control.clone(), None));
//!     let broker = Arc::new(Broker::new(Default::default()));
//!
//!     let state = AppState::new(fleet, control, broker, ServerConfig::default());
//!     serve(state, &ServerConfig::default()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod controlplane;
pub mod events;
pub mod format;
pub mod models;
pub mod render;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiError, AppState, ServerConfig};

pub use controlplane::{
    AgentClient, ControlPlaneClient, ControlPlaneConfig, ControlPlaneError, FleetService,
    PreAuthKey,
};

pub use events::{
    Broker, BrokerConfig, Event, FleetSnapshot, Poller, SnapshotFetcher, SnapshotRenderer,
    Subscription,
};

pub use models::{machine_counts, Machine, Node, PeerStatus, User, UserRef, EXIT_ROUTES};

pub use config::{Config, ConfigError, LoggingConfig};
