//! Application startup and lifecycle management.

use crate::config::StorefrontConfig;
use crate::handlers;
use crate::services::{init_metrics, Database, OrderRepository, PaystackClient, StripeClient};
use crate::AppState;
use axum::{
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{make_request_span, request_id_middleware},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Connect to PostgreSQL, apply migrations and bind the listener.
    pub async fn build(config: StorefrontConfig) -> Result<Self, AppError> {
        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            e
        })?;

        Self::build_with_repository(config, Arc::new(db)).await
    }

    /// Build around an existing order store. Integration tests use this with
    /// an in-memory repository.
    pub async fn build_with_repository(
        config: StorefrontConfig,
        repository: Arc<dyn OrderRepository>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let paystack = PaystackClient::new(
            config.paystack.clone(),
            config.urls.public_api("/api/payments/paystack/callback"),
            config.provider_timeout,
        )
        .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;
        if paystack.is_configured() {
            tracing::info!("Paystack client initialized");
        } else {
            tracing::warn!(
                "Paystack secret key not configured - Paystack checkout and webhooks are disabled"
            );
        }

        let stripe = StripeClient::new(
            config.stripe.clone(),
            config.urls.site("/checkout/success"),
            config.urls.site("/checkout?cancelled=true"),
            config.provider_timeout,
        )
        .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;
        if stripe.is_configured() {
            tracing::info!("Stripe client initialized");
        } else {
            tracing::warn!("Stripe secret key not configured - Stripe checkout is disabled");
        }

        let state = AppState {
            config: config.clone(),
            repository,
            paystack,
            stripe,
        };

        let router = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/metrics", get(handlers::metrics))
            // Orders
            .route("/api/orders", post(handlers::orders::create_order))
            .route("/api/orders/:id", get(handlers::orders::get_order))
            .route(
                "/api/orders/:id/status",
                patch(handlers::orders::update_order_status),
            )
            .route(
                "/api/orders/:id/checkout",
                post(handlers::checkout::start_checkout),
            )
            // Provider notifications
            .route("/api/webhooks/paystack", post(handlers::paystack::webhook))
            .route("/api/webhooks/stripe", post(handlers::stripe::webhook))
            .route(
                "/api/payments/paystack/callback",
                get(handlers::paystack::callback),
            )
            .layer(from_fn(metrics_middleware))
            .layer(from_fn(security_headers_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(make_request_span::<axum::body::Body>),
            )
            .layer(from_fn(request_id_middleware))
            .with_state(state);

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Storefront payments listener bound");

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Port the HTTP listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}
