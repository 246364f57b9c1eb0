//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Machine;

/// A user as reported by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Display name, falling back to the login name.
    pub fn display(&self) -> &str {
        match &self.display_name {
            Some(d) if !d.is_empty() => d,
            _ => &self.name,
        }
    }

    pub fn created(&self) -> String {
        match self.created_at {
            Some(t) => t.format("%b %-d, %Y").to_string(),
            None => "-".to_string(),
        }
    }
}

/// Machines owned per user name, derived fresh from a fleet snapshot.
pub fn machine_counts(machines: &[Machine]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for m in machines {
        *counts.entry(m.user().to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Node, UserRef};

    fn machine_for(user: &str) -> Machine {
        Machine::new(Node {
            id: 0,
            name: "n".to_string(),
            given_name: String::new(),
            user: Some(UserRef {
                id: 1,
                name: user.to_string(),
            }),
            ip_addresses: vec![],
            online: false,
            approved_routes: vec![],
            available_routes: vec![],
            forced_tags: vec![],
            last_seen: None,
            created_at: None,
            expiry: None,
            node_key: String::new(),
        })
    }

    #[test]
    fn test_machine_counts_per_user() {
        let machines = vec![machine_for("alice"), machine_for("alice"), machine_for("bob")];
        let counts = machine_counts(&machines);
        assert_eq!(counts.get("alice"), Some(&2));
        assert_eq!(counts.get("bob"), Some(&1));
        assert_eq!(counts.get("carol"), None);
    }

    #[test]
    fn test_display_falls_back_to_name() {
        let u = User {
            id: 1,
            name: "alice".to_string(),
            display_name: None,
            created_at: None,
        };
        assert_eq!(u.display(), "alice");

        let d = User {
            display_name: Some("Alice A".to_string()),
            ..u
        };
        assert_eq!(d.display(), "Alice A");
    }
}
