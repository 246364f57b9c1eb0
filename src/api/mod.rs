//! Fleetdeck console server
//!
//! HTTP layer for the admin console, built with Axum.
//!
//! # Endpoints
//!
//! ## Pages
//! - `GET /` - redirect to the machines overview
//! - `GET /machines` - machines overview (optional `?search=`)
//! - `GET /machines/:id` - machine detail
//! - `GET /users` - users overview
//!
//! ## Machine actions
//! - `POST /machines/:id/rename` - rename (HX-Prompt)
//! - `POST /machines/:id/move` - change owner (HX-Prompt)
//! - `POST /machines/:id/tags` - replace tags (HX-Prompt)
//! - `POST /machines/:id/expire` - expire the node key
//! - `DELETE /machines/:id` - remove the machine
//! - `POST /machines/:id/exit-node/approve` - allow exit node
//! - `POST /machines/:id/exit-node/reject` - disallow exit node
//! - `POST /machines/:id/routes/approve` - approve an advertised subnet
//! - `POST /machines/:id/routes/reject` - revoke an approved subnet
//!
//! ## User actions
//! - `POST /users` - create a user
//! - `POST /users/:id/rename` - rename (HX-Prompt)
//! - `POST /users/:id/preauth-keys` - mint a pre-auth key
//! - `DELETE /users/:id` - delete a user
//!
//! ## Streaming
//! - `GET /events` - server-sent events with rendered table fragments
//!
//! ## Health
//! - `GET /health` - status, uptime, connected clients (never behind auth)

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, ServerConfig};

use axum::{
    middleware,
    response::Redirect,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the console router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    let console = Router::new()
        .route("/", get(|| async { Redirect::to("/machines") }))
        // Machine pages
        .route("/machines", get(routes::machines::list_machines))
        .route(
            "/machines/:id",
            get(routes::machines::machine_detail).delete(routes::actions::delete_machine),
        )
        // Machine actions
        .route("/machines/:id/rename", post(routes::actions::rename_machine))
        .route("/machines/:id/move", post(routes::actions::move_machine))
        .route("/machines/:id/tags", post(routes::actions::set_machine_tags))
        .route("/machines/:id/expire", post(routes::actions::expire_machine))
        .route(
            "/machines/:id/exit-node/approve",
            post(routes::actions::approve_exit_node),
        )
        .route(
            "/machines/:id/exit-node/reject",
            post(routes::actions::reject_exit_node),
        )
        .route(
            "/machines/:id/routes/approve",
            post(routes::actions::approve_route),
        )
        .route(
            "/machines/:id/routes/reject",
            post(routes::actions::reject_route),
        )
        // User pages and actions
        .route(
            "/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route("/users/:id/rename", post(routes::users::rename_user))
        .route(
            "/users/:id/preauth-keys",
            post(routes::users::create_preauth_key),
        )
        .route("/users/:id", delete(routes::users::delete_user))
        // Live event stream
        .route("/events", get(routes::sse::subscribe))
        .layer(middleware::from_fn_with_state(
            shared_state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .merge(console)
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Start the console server
pub async fn serve(state: AppState, config: &ServerConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Fleetdeck console listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Fleetdeck console shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
