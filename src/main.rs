//! Fleetdeck console server
//!
//! Run with: cargo run
//!
//! # Configuration
//!
//! Loads `config.toml` (see `--print-default-config`), with environment
//! overrides:
//! - `FLEETDECK_CONTROL_PLANE_URL`: coordination server base URL
//! - `FLEETDECK_API_KEY`: control plane API key
//! - `FLEETDECK_AGENT_URL`: local agent status endpoint
//! - `FLEETDECK_HOST` / `FLEETDECK_PORT`: console bind address
//! - `FLEETDECK_AUTH_TOKEN`: console access token (unset disables auth)
//! - `FLEETDECK_POLL_INTERVAL_MS`: change-detection poll interval
//! - `FLEETDECK_LOG_LEVEL` / `FLEETDECK_LOG_FORMAT`: logging

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleetdeck::api::{serve, AppState, ServerConfig};
use fleetdeck::config::{generate_default_config, Config};
use fleetdeck::controlplane::{AgentClient, ControlPlaneClient, ControlPlaneConfig, FleetService};
use fleetdeck::events::{Broker, BrokerConfig, Poller};
use fleetdeck::render::HtmlRenderer;

#[derive(Parser, Debug)]
#[command(name = "fleetdeck", version, about = "Admin console for a mesh VPN control plane")]
struct Args {
    /// Path to a config file (defaults to standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print a commented default config and exit
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", generate_default_config());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_tracing(&config);

    tracing::info!("Starting Fleetdeck v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Control plane: {}", config.control_plane.url);

    // Clients
    let control = Arc::new(ControlPlaneClient::new(ControlPlaneConfig {
        base_url: config.control_plane.url.clone(),
        api_key: config.control_plane.api_key.clone(),
        request_timeout_ms: config.control_plane.request_timeout_ms,
    }));

    match control.health_check().await {
        Ok(_) => tracing::info!("Control plane connection verified"),
        Err(e) => tracing::warn!("Control plane not reachable yet: {}", e),
    }

    let agent = if config.agent.enabled {
        tracing::info!("Agent enrichment enabled: {}", config.agent.url);
        Some(Arc::new(AgentClient::new(
            config.agent.url.clone(),
            config.control_plane.request_timeout_ms,
        )))
    } else {
        tracing::info!("Agent enrichment disabled");
        None
    };

    let fleet = Arc::new(FleetService::new(control.clone(), agent));

    // Live update pipeline
    let broker = Arc::new(Broker::new(BrokerConfig {
        subscriber_queue_capacity: config.events.subscriber_queue_capacity,
        broadcast_queue_capacity: config.events.broadcast_queue_capacity,
    }));

    let poller = Poller::new(
        broker.clone(),
        fleet.clone(),
        Arc::new(HtmlRenderer),
        Duration::from_millis(config.events.poll_interval_ms),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_handle = tokio::spawn(poller.run(shutdown_rx));

    // Console server
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        auth_token: config.auth.token.clone(),
    };
    if server_config.auth_token.is_none() {
        tracing::warn!("No auth token configured, the console is open");
    }

    let state = AppState::new(fleet, control, broker.clone(), server_config.clone());
    serve(state, &server_config).await?;

    // Graceful shutdown: stop the poller, then close every event stream.
    let _ = shutdown_tx.send(true);
    let _ = poller_handle.await;
    broker.close();

    tracing::info!("Fleetdeck stopped");
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "fleetdeck={},tower_http=info",
            config.logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
