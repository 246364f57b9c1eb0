//! Machine model
//!
//! A machine combines the control plane's view of a node with the local
//! agent's runtime status for the same peer, and exposes the derived,
//! display-oriented accessors the console and the change detector consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::format;

/// Exit-node routes advertised alongside ordinary subnets.
pub const EXIT_ROUTES: [&str; 2] = ["0.0.0.0/0", "::/0"];

fn is_exit_route(route: &str) -> bool {
    EXIT_ROUTES.contains(&route)
}

/// A node as reported by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub approved_routes: Vec<String>,
    #[serde(default)]
    pub available_routes: Vec<String>,
    #[serde(default)]
    pub forced_tags: Vec<String>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub node_key: String,
}

/// Owner reference embedded in a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// Runtime status of one peer as reported by the local agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerStatus {
    #[serde(default)]
    pub ips: Vec<String>,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub client_version: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub relay: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// A node enriched with agent runtime data, ready for display.
#[derive(Debug, Clone)]
pub struct Machine {
    pub node: Node,
    pub peer: Option<PeerStatus>,
}

impl Machine {
    pub fn new(node: Node) -> Self {
        Self { node, peer: None }
    }

    pub fn id(&self) -> u64 {
        self.node.id
    }

    pub fn online(&self) -> bool {
        self.node.online
    }

    /// Preferred display name: given name, falling back to the raw name.
    pub fn hostname(&self) -> &str {
        if !self.node.given_name.is_empty() {
            &self.node.given_name
        } else if !self.node.name.is_empty() {
            &self.node.name
        } else {
            "-"
        }
    }

    pub fn user(&self) -> &str {
        self.node
            .user
            .as_ref()
            .map(|u| u.name.as_str())
            .unwrap_or("-")
    }

    pub fn user_id(&self) -> Option<u64> {
        self.node.user.as_ref().map(|u| u.id)
    }

    /// First listed address, usually the IPv4 one.
    pub fn primary_ip(&self) -> &str {
        self.node
            .ip_addresses
            .first()
            .map(String::as_str)
            .unwrap_or("-")
    }

    pub fn tags(&self) -> &[String] {
        &self.node.forced_tags
    }

    pub fn tags_string(&self) -> String {
        self.node.forced_tags.join(", ")
    }

    pub fn status_text(&self) -> &'static str {
        if self.node.online {
            "Online"
        } else {
            "Offline"
        }
    }

    pub fn status_dot_class(&self) -> &'static str {
        if self.node.online {
            "dot-online"
        } else {
            "dot-offline"
        }
    }

    pub fn last_seen_short(&self) -> String {
        format::last_seen_short(self.node.last_seen, self.node.online)
    }

    pub fn last_seen_full(&self) -> String {
        format::last_seen_full(self.node.last_seen)
    }

    pub fn os(&self) -> &str {
        self.peer
            .as_ref()
            .filter(|p| !p.os.is_empty())
            .map(|p| p.os.as_str())
            .unwrap_or("-")
    }

    pub fn client_version(&self) -> &str {
        self.peer
            .as_ref()
            .filter(|p| !p.client_version.is_empty())
            .map(|p| p.client_version.as_str())
            .unwrap_or("-")
    }

    pub fn connection_type(&self) -> &'static str {
        match &self.peer {
            Some(p) if p.relay.as_deref().map(|r| !r.is_empty()).unwrap_or(false) => "Relay",
            _ => "Direct",
        }
    }

    pub fn node_key_short(&self) -> String {
        let key = &self.node.node_key;
        if key.is_empty() {
            return "-".to_string();
        }
        if key.len() <= 16 {
            return key.clone();
        }
        format!("{}...", &key[..16])
    }

    pub fn created(&self) -> String {
        match self.node.created_at {
            Some(t) => t.format("%b %-d, %Y at %-I:%M %p UTC").to_string(),
            None => "-".to_string(),
        }
    }

    /// Key expiration for display. Far-future or absent expiry reads as
    /// never expiring.
    pub fn key_expiry(&self) -> String {
        use chrono::Datelike;
        match self.node.expiry {
            Some(t) if t.timestamp() > 0 && t.year() <= 9000 => {
                t.format("%b %-d, %Y at %-I:%M %p UTC").to_string()
            }
            _ => "No expiry".to_string(),
        }
    }

    /// Approved subnet routes, excluding exit-node routes.
    pub fn approved_subnets(&self) -> Vec<&str> {
        self.node
            .approved_routes
            .iter()
            .map(String::as_str)
            .filter(|r| !is_exit_route(r))
            .collect()
    }

    /// Advertised-but-unapproved subnet routes, excluding exit-node routes.
    pub fn advertised_subnets(&self) -> Vec<&str> {
        self.node
            .available_routes
            .iter()
            .map(String::as_str)
            .filter(|r| !is_exit_route(r) && !self.node.approved_routes.iter().any(|a| a == *r))
            .collect()
    }

    pub fn has_subnet_routes(&self) -> bool {
        !self.approved_subnets().is_empty() || !self.advertised_subnets().is_empty()
    }

    /// Approved as an exit node AND still advertising it.
    pub fn exit_node_approved(&self) -> bool {
        let approved = self.node.approved_routes.iter().any(|r| is_exit_route(r));
        let advertising = self.node.available_routes.iter().any(|r| is_exit_route(r));
        approved && advertising
    }

    /// Advertising exit-node routes that have not been approved.
    pub fn exit_node_advertised(&self) -> bool {
        self.node
            .available_routes
            .iter()
            .any(|r| is_exit_route(r) && !self.node.approved_routes.iter().any(|a| a == r))
    }

    /// "Allowed", "Awaiting approval", or "".
    pub fn exit_node_status(&self) -> &'static str {
        if self.exit_node_approved() {
            "Allowed"
        } else if self.exit_node_advertised() {
            "Awaiting approval"
        } else {
            ""
        }
    }

    pub fn has_exit_node(&self) -> bool {
        self.exit_node_approved() || self.exit_node_advertised()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(approved: &[&str], available: &[&str]) -> Node {
        Node {
            id: 1,
            name: "node-1".to_string(),
            given_name: "office".to_string(),
            user: Some(UserRef {
                id: 7,
                name: "alice".to_string(),
            }),
            ip_addresses: vec!["100.64.0.1".to_string()],
            online: true,
            approved_routes: approved.iter().map(|s| s.to_string()).collect(),
            available_routes: available.iter().map(|s| s.to_string()).collect(),
            forced_tags: vec!["tag:server".to_string()],
            last_seen: None,
            created_at: None,
            expiry: None,
            node_key: "nodekey:0123456789abcdef0123".to_string(),
        }
    }

    #[test]
    fn test_hostname_prefers_given_name() {
        let m = Machine::new(node(&[], &[]));
        assert_eq!(m.hostname(), "office");

        let mut bare = node(&[], &[]);
        bare.given_name.clear();
        assert_eq!(Machine::new(bare).hostname(), "node-1");
    }

    #[test]
    fn test_approved_subnets_exclude_exit_routes() {
        let m = Machine::new(node(&["10.0.0.0/24", "0.0.0.0/0", "::/0"], &[]));
        assert_eq!(m.approved_subnets(), vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_advertised_subnets_are_pending_only() {
        let m = Machine::new(node(
            &["10.0.0.0/24"],
            &["10.0.0.0/24", "192.168.1.0/24", "0.0.0.0/0"],
        ));
        assert_eq!(m.advertised_subnets(), vec!["192.168.1.0/24"]);
    }

    #[test]
    fn test_exit_node_status_allowed() {
        let m = Machine::new(node(&["0.0.0.0/0", "::/0"], &["0.0.0.0/0", "::/0"]));
        assert!(m.exit_node_approved());
        assert_eq!(m.exit_node_status(), "Allowed");
    }

    #[test]
    fn test_exit_node_status_awaiting_approval() {
        let m = Machine::new(node(&[], &["0.0.0.0/0", "::/0"]));
        assert!(!m.exit_node_approved());
        assert!(m.exit_node_advertised());
        assert_eq!(m.exit_node_status(), "Awaiting approval");
    }

    #[test]
    fn test_exit_node_approved_requires_active_advertisement() {
        // Approved in the past but no longer advertised.
        let m = Machine::new(node(&["0.0.0.0/0"], &[]));
        assert!(!m.exit_node_approved());
        assert_eq!(m.exit_node_status(), "");
    }

    #[test]
    fn test_node_key_short() {
        let m = Machine::new(node(&[], &[]));
        assert_eq!(m.node_key_short(), "nodekey:01234567...");
    }
}
