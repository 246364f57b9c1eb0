//! Machine pages
//!
//! - GET /machines - overview with optional search filter
//! - GET /machines/:id - detail view with action controls

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Html,
};
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::models::Machine;
use crate::render::pages;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
}

/// GET /machines
pub async fn list_machines(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Html<String>> {
    let mut machines = state
        .fleet
        .list_machines()
        .await
        .map_err(ApiError::from_fleet)?;

    let search = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if let Some(needle) = search {
        machines.retain(|m| matches_search(m, needle));
    }

    Ok(Html(pages::machines_page(&machines, search)))
}

fn matches_search(machine: &Machine, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    machine.hostname().to_lowercase().contains(&needle)
        || machine.user().to_lowercase().contains(&needle)
        || machine
            .node
            .ip_addresses
            .iter()
            .any(|ip| ip.contains(&needle))
        || machine
            .tags()
            .iter()
            .any(|t| t.to_lowercase().contains(&needle))
}

/// GET /machines/:id
pub async fn machine_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Html<String>> {
    let machine = state
        .fleet
        .get_machine(id)
        .await
        .map_err(ApiError::from_fleet)?;
    Ok(Html(pages::machine_detail_page(&machine)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Node, UserRef};

    fn machine(name: &str, user: &str, ip: &str, tags: &[&str]) -> Machine {
        Machine::new(Node {
            id: 1,
            name: name.to_string(),
            given_name: String::new(),
            user: Some(UserRef {
                id: 1,
                name: user.to_string(),
            }),
            ip_addresses: vec![ip.to_string()],
            online: false,
            approved_routes: vec![],
            available_routes: vec![],
            forced_tags: tags.iter().map(|s| s.to_string()).collect(),
            last_seen: None,
            created_at: None,
            expiry: None,
            node_key: String::new(),
        })
    }

    #[test]
    fn test_search_matches_name_user_ip_and_tag() {
        let m = machine("Web-Frontend", "alice", "100.64.0.9", &["tag:prod"]);
        assert!(matches_search(&m, "web"));
        assert!(matches_search(&m, "ALICE"));
        assert!(matches_search(&m, "100.64.0.9"));
        assert!(matches_search(&m, "prod"));
        assert!(!matches_search(&m, "database"));
    }
}
