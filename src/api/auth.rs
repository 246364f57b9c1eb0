//! Console authentication
//!
//! Optional single-token guard over every route. The token arrives as a
//! bearer header, or as a `token` query parameter for clients that cannot
//! set headers on an EventSource connection.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::state::AppState;

/// Reject requests that do not carry the configured token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.config.auth_token else {
        return next.run(request).await;
    };

    if bearer_token(&request).as_deref() == Some(expected.as_str())
        || query_token(&request).as_deref() == Some(expected.as_str())
    {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated request");
    (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn query_token(request: &Request) -> Option<String> {
    request
        .uri()
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token=").map(str::to_string))
}
