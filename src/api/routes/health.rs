//! Health endpoint
//!
//! - GET /health - process status, uptime, and live-stream client count

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub connected_clients: usize,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        connected_clients: state.broker.client_count(),
    })
}
