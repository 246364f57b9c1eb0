//! Machine actions
//!
//! Mutating endpoints behind the detail-page buttons. Prompted values
//! (names, owners, tags) arrive in the HX-Prompt request header; route
//! approvals carry the route in the form body. Every response is an alert
//! fragment; the tables themselves refresh through the event stream once
//! the poller observes the change.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Html,
    Form,
};
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::models::EXIT_ROUTES;
use crate::render::pages;

fn prompt_value(headers: &HeaderMap, what: &str) -> ApiResult<String> {
    let value = headers
        .get("HX-Prompt")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("");
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{what} must not be empty")));
    }
    Ok(value.to_string())
}

/// POST /machines/:id/rename
pub async fn rename_machine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<Html<String>> {
    let name = prompt_value(&headers, "Machine name")?;
    let node = state.control.rename_node(id, &name).await?;
    tracing::info!(machine_id = id, name = %node.given_name, "Machine renamed");
    Ok(Html(pages::success_alert(&format!(
        "Machine renamed to {name}"
    ))))
}

/// POST /machines/:id/move
pub async fn move_machine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<Html<String>> {
    let user = prompt_value(&headers, "Owner")?;
    state.control.move_node(id, &user).await?;
    tracing::info!(machine_id = id, user = %user, "Machine reassigned");
    Ok(Html(pages::success_alert(&format!(
        "Machine moved to {user}"
    ))))
}

/// POST /machines/:id/tags
pub async fn set_machine_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<Html<String>> {
    // Empty prompt clears all tags.
    let raw = headers
        .get("HX-Prompt")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let tags: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(normalize_tag)
        .collect();

    state.control.set_tags(id, &tags).await?;
    tracing::info!(machine_id = id, tags = ?tags, "Machine tags updated");
    Ok(Html(pages::success_alert(if tags.is_empty() {
        "Tags cleared"
    } else {
        "Tags updated"
    })))
}

fn normalize_tag(tag: &str) -> String {
    if tag.starts_with("tag:") {
        tag.to_string()
    } else {
        format!("tag:{tag}")
    }
}

/// POST /machines/:id/expire
pub async fn expire_machine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Html<String>> {
    state.control.expire_node(id).await?;
    tracing::info!(machine_id = id, "Machine key expired");
    Ok(Html(pages::success_alert(
        "Key expired, the machine must reauthenticate",
    )))
}

/// DELETE /machines/:id
pub async fn delete_machine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Html<String>> {
    state.control.delete_node(id).await?;
    tracing::info!(machine_id = id, "Machine removed");
    Ok(Html(pages::success_alert("Machine removed")))
}

/// POST /machines/:id/exit-node/approve
pub async fn approve_exit_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Html<String>> {
    let node = state.control.get_node(id).await?;

    let mut routes = node.approved_routes;
    for exit in EXIT_ROUTES {
        if !routes.iter().any(|r| r == exit) {
            routes.push(exit.to_string());
        }
    }

    state.control.set_approved_routes(id, &routes).await?;
    tracing::info!(machine_id = id, "Exit node approved");
    Ok(Html(pages::success_alert("Exit node approved")))
}

/// POST /machines/:id/exit-node/reject
pub async fn reject_exit_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Html<String>> {
    let node = state.control.get_node(id).await?;

    let routes: Vec<String> = node
        .approved_routes
        .into_iter()
        .filter(|r| !EXIT_ROUTES.contains(&r.as_str()))
        .collect();

    state.control.set_approved_routes(id, &routes).await?;
    tracing::info!(machine_id = id, "Exit node disallowed");
    Ok(Html(pages::success_alert("Exit node disallowed")))
}

#[derive(Debug, Deserialize)]
pub struct RouteForm {
    pub route: String,
}

/// POST /machines/:id/routes/approve
pub async fn approve_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Form(form): Form<RouteForm>,
) -> ApiResult<Html<String>> {
    let route = form.route.trim();
    if route.is_empty() {
        return Err(ApiError::Validation("Route must not be empty".to_string()));
    }

    let node = state.control.get_node(id).await?;
    if !node.available_routes.iter().any(|r| r == route) {
        return Err(ApiError::Validation(format!(
            "Machine does not advertise {route}"
        )));
    }

    let mut routes = node.approved_routes;
    if !routes.iter().any(|r| r == route) {
        routes.push(route.to_string());
    }

    state.control.set_approved_routes(id, &routes).await?;
    tracing::info!(machine_id = id, route = %route, "Route approved");
    Ok(Html(pages::success_alert(&format!("Approved {route}"))))
}

/// POST /machines/:id/routes/reject
pub async fn reject_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Form(form): Form<RouteForm>,
) -> ApiResult<Html<String>> {
    let route = form.route.trim();
    if route.is_empty() {
        return Err(ApiError::Validation("Route must not be empty".to_string()));
    }

    let node = state.control.get_node(id).await?;
    let routes: Vec<String> = node
        .approved_routes
        .into_iter()
        .filter(|r| r != route)
        .collect();

    state.control.set_approved_routes(id, &routes).await?;
    tracing::info!(machine_id = id, route = %route, "Route revoked");
    Ok(Html(pages::success_alert(&format!("Revoked {route}"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag_adds_prefix_once() {
        assert_eq!(normalize_tag("prod"), "tag:prod");
        assert_eq!(normalize_tag("tag:prod"), "tag:prod");
    }

    #[test]
    fn test_prompt_value_rejects_missing_and_blank() {
        let mut headers = HeaderMap::new();
        assert!(prompt_value(&headers, "Name").is_err());

        headers.insert("HX-Prompt", "   ".parse().unwrap());
        assert!(prompt_value(&headers, "Name").is_err());

        headers.insert("HX-Prompt", " web-1 ".parse().unwrap());
        assert_eq!(prompt_value(&headers, "Name").unwrap(), "web-1");
    }
}
