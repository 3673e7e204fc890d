//! HTTP handlers for storefront-payments.

pub mod checkout;
pub mod orders;
pub mod paystack;
pub mod stripe;

use crate::services::get_metrics;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Liveness probe; also pings the order store.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.repository.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": state.config.service_name,
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - order store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": state.config.service_name,
                    "error": "order store unavailable"
                })),
            )
        }
    }
}

pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

/// Rejection for inbound provider webhooks.
///
/// Providers only look at the status code, so the body is short plain text
/// rather than the JSON error envelope used by the rest of the API.
#[derive(Debug, Error)]
pub enum WebhookRejection {
    #[error("Invalid signature")]
    InvalidSignature(StatusCode),

    #[error("Invalid payload")]
    InvalidPayload,
}

impl IntoResponse for WebhookRejection {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookRejection::InvalidSignature(status) => *status,
            WebhookRejection::InvalidPayload => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}
