//! User pages and actions
//!
//! - GET /users - overview with the live-updating table
//! - POST /users - create a user
//! - POST /users/:id/rename - rename (new name in HX-Prompt)
//! - POST /users/:id/preauth-keys - mint a pre-authentication key
//! - DELETE /users/:id - delete a user

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Html,
    Form,
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::render::pages;

/// GET /users
pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let users = state
        .fleet
        .list_users()
        .await
        .map_err(ApiError::from_fleet)?;
    let machines = state
        .fleet
        .list_machines()
        .await
        .map_err(ApiError::from_fleet)?;
    Ok(Html(pages::users_page(&users, &machines)))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    pub name: String,
}

/// POST /users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CreateUserForm>,
) -> ApiResult<Html<String>> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("User name must not be empty".to_string()));
    }

    let user = state.control.create_user(name).await?;
    tracing::info!(user_id = user.id, name = %user.name, "User created");
    Ok(Html(pages::success_alert(&format!("Created user {name}"))))
}

/// POST /users/:id/rename
pub async fn rename_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> ApiResult<Html<String>> {
    let name = headers
        .get("HX-Prompt")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("");
    if name.is_empty() {
        return Err(ApiError::Validation("User name must not be empty".to_string()));
    }

    state.control.rename_user(id, name).await?;
    tracing::info!(user_id = id, name = %name, "User renamed");
    Ok(Html(pages::success_alert(&format!("User renamed to {name}"))))
}

/// DELETE /users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Html<String>> {
    state.control.delete_user(id).await?;
    tracing::info!(user_id = id, "User deleted");
    Ok(Html(pages::success_alert("User deleted")))
}

/// POST /users/:id/preauth-keys
///
/// Single-use key valid for 90 days. The key is shown once in the alert;
/// it is not retrievable afterwards.
pub async fn create_preauth_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Html<String>> {
    let expiration = Utc::now() + Duration::days(90);
    let key = state
        .control
        .create_preauth_key(id, false, false, expiration)
        .await?;

    tracing::info!(user_id = id, "Pre-auth key created");
    Ok(Html(pages::success_alert(&format!(
        "Pre-auth key (valid 90 days): {}",
        key.key
    ))))
}
