//! Fleet service
//!
//! Merges the control plane's node list with the local agent's peer status
//! into display-ready machines, and implements the snapshot source the
//! polling loop consumes. Agent failures are non-fatal: the console still
//! works from control-plane data alone.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::controlplane::agent::AgentClient;
use crate::controlplane::client::ControlPlaneClient;
use crate::events::{FleetSnapshot, SnapshotFetcher};
use crate::models::{Machine, PeerStatus, User};

/// Combined view over the control plane and the local agent
pub struct FleetService {
    control: Arc<ControlPlaneClient>,
    agent: Option<Arc<AgentClient>>,
}

impl FleetService {
    pub fn new(control: Arc<ControlPlaneClient>, agent: Option<Arc<AgentClient>>) -> Self {
        Self { control, agent }
    }

    /// List all machines, enriched with agent peer data where available.
    pub async fn list_machines(&self) -> anyhow::Result<Vec<Machine>> {
        let nodes = self.control.list_nodes().await?;
        let peers = self.peer_index().await;

        Ok(nodes
            .into_iter()
            .map(|node| {
                let peer = node
                    .ip_addresses
                    .iter()
                    .find_map(|ip| peers.get(ip.as_str()).cloned());
                Machine { node, peer }
            })
            .collect())
    }

    /// Fetch one machine by id, enriched with agent peer data.
    pub async fn get_machine(&self, id: u64) -> anyhow::Result<Machine> {
        let node = self.control.get_node(id).await?;
        let peers = self.peer_index().await;
        let peer = node
            .ip_addresses
            .iter()
            .find_map(|ip| peers.get(ip.as_str()).cloned());
        Ok(Machine { node, peer })
    }

    pub async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.control.list_users().await?)
    }

    /// Agent peers keyed by IP. Empty when the agent is disabled or down.
    async fn peer_index(&self) -> HashMap<String, PeerStatus> {
        let Some(agent) = &self.agent else {
            return HashMap::new();
        };

        match agent.status().await {
            Ok(peers) => {
                let mut index = HashMap::new();
                for peer in peers {
                    for ip in &peer.ips {
                        index.insert(ip.clone(), peer.clone());
                    }
                }
                index
            }
            Err(e) => {
                tracing::warn!(error = %e, "Agent status unavailable, serving control-plane data only");
                HashMap::new()
            }
        }
    }
}

#[async_trait]
impl SnapshotFetcher for FleetService {
    async fn fetch(&self) -> anyhow::Result<FleetSnapshot> {
        let machines = self.list_machines().await?;
        let users = self.list_users().await?;
        Ok(FleetSnapshot { machines, users })
    }
}
