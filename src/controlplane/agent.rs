//! Local agent status client
//!
//! Talks to the mesh agent running next to the console to pull per-peer
//! runtime details (OS, client version, relay vs direct) that the control
//! plane does not report.

use reqwest::Client;
use serde::Deserialize;

use crate::models::PeerStatus;

/// Client for the local agent's status endpoint
pub struct AgentClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    peers: Vec<PeerStatus>,
}

impl AgentClient {
    pub fn new(base_url: String, request_timeout_ms: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(request_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, base_url }
    }

    /// Fetch runtime status for all known peers
    pub async fn status(&self) -> anyhow::Result<Vec<PeerStatus>> {
        let url = format!("{}/status", self.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("agent status returned {}", response.status());
        }

        let status: StatusResponse = response.json().await?;
        Ok(status.peers)
    }
}
