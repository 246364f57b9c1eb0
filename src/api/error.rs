//! API Error Types
//!
//! Errors from handlers become HTML alert fragments so HTMX can drop them
//! into the page's alert area, with response headers retargeting the swap.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use crate::controlplane::ControlPlaneError;
use crate::render::pages;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Control plane call failed
    #[error("Control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    /// Snapshot assembly failed
    #[error("Fleet error: {0}")]
    Fleet(#[from] anyhow::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Recover the control-plane error from a fleet-layer failure so the
    /// response status reflects what actually went wrong.
    pub fn from_fleet(e: anyhow::Error) -> Self {
        match e.downcast::<ControlPlaneError>() {
            Ok(cp) => ApiError::ControlPlane(cp),
            Err(e) => ApiError::Fleet(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ControlPlane(e) => match e {
                ControlPlaneError::Unavailable | ControlPlaneError::Timeout => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                ControlPlaneError::Api { status, .. } if *status == 404 => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
            ApiError::Fleet(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            request_id = %request_id,
            status = %status,
            error_message = %self,
            "Request failed"
        );

        // Retarget so HTMX puts the alert in the alert area regardless of
        // which element issued the request.
        (
            status,
            [("HX-Retarget", "#alerts"), ("HX-Reswap", "innerHTML")],
            Html(pages::error_alert(&self.to_string())),
        )
            .into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
