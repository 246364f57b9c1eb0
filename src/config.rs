//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub control_plane: ControlPlaneSection,

    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub events: EventsSection,

    #[serde(default)]
    pub auth: AuthSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Control plane connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ControlPlaneSection {
    #[serde(default = "default_control_plane_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_control_plane_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    5000
}

impl Default for ControlPlaneSection {
    fn default() -> Self {
        Self {
            url: default_control_plane_url(),
            api_key: String::new(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Local agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    #[serde(default = "default_agent_enabled")]
    pub enabled: bool,

    #[serde(default = "default_agent_url")]
    pub url: String,
}

fn default_agent_enabled() -> bool {
    true
}

fn default_agent_url() -> String {
    "http://localhost:4141".to_string()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            enabled: default_agent_enabled(),
            url: default_agent_url(),
        }
    }
}

/// Console server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Live update pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_subscriber_queue")]
    pub subscriber_queue_capacity: usize,

    #[serde(default = "default_broadcast_queue")]
    pub broadcast_queue_capacity: usize,
}

fn default_poll_interval() -> u64 {
    500
}

fn default_subscriber_queue() -> usize {
    5
}

fn default_broadcast_queue() -> usize {
    10
}

impl Default for EventsSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            subscriber_queue_capacity: default_subscriber_queue(),
            broadcast_queue_capacity: default_broadcast_queue(),
        }
    }
}

/// Console authentication configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSection {
    /// Token required on every console request. Unset disables auth.
    pub token: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("fleetdeck").join("config.toml")),
            Some(PathBuf::from("/etc/fleetdeck/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Control plane overrides
        if let Ok(url) = std::env::var("FLEETDECK_CONTROL_PLANE_URL") {
            self.control_plane.url = url;
        }
        if let Ok(key) = std::env::var("FLEETDECK_API_KEY") {
            self.control_plane.api_key = key;
        }

        // Agent overrides
        if let Ok(url) = std::env::var("FLEETDECK_AGENT_URL") {
            self.agent.url = url;
        }

        // Server overrides
        if let Ok(host) = std::env::var("FLEETDECK_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("FLEETDECK_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        // Auth overrides
        if let Ok(token) = std::env::var("FLEETDECK_AUTH_TOKEN") {
            self.auth.token = if token.is_empty() { None } else { Some(token) };
        }

        // Events overrides
        if let Ok(interval) = std::env::var("FLEETDECK_POLL_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                self.events.poll_interval_ms = ms;
            }
        }

        // Logging overrides
        if let Ok(level) = std::env::var("FLEETDECK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("FLEETDECK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_plane: ControlPlaneSection::default(),
            agent: AgentSection::default(),
            server: ServerSection::default(),
            events: EventsSection::default(),
            auth: AuthSection::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Fleetdeck Configuration
#
# Environment variables override these settings:
# - FLEETDECK_CONTROL_PLANE_URL
# - FLEETDECK_API_KEY
# - FLEETDECK_AGENT_URL
# - FLEETDECK_HOST
# - FLEETDECK_PORT
# - FLEETDECK_AUTH_TOKEN
# - FLEETDECK_POLL_INTERVAL_MS
# - FLEETDECK_LOG_LEVEL
# - FLEETDECK_LOG_FORMAT

[control_plane]
# Coordination server base URL
url = "http://localhost:8080"

# API key for the control plane admin API
api_key = ""

# Request timeout in milliseconds
request_timeout_ms = 5000

[agent]
# Enrich machines with runtime data from the local mesh agent
enabled = true

# Agent status endpoint base URL
url = "http://localhost:4141"

[server]
# Console server host
host = "0.0.0.0"

# Console server port
port = 8081

[events]
# How often to poll the control plane for changes (ms)
poll_interval_ms = 500

# Per-client queue depth for the live event stream
subscriber_queue_capacity = 5

# Shared intake queue depth between poller and broker
broadcast_queue_capacity = 10

[auth]
# Token required on every console request; omit to disable auth
# token = "change-me"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
