//! Checkout initiation: hand the shopper to a hosted payment page.

use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::{CheckoutRequest, CheckoutResponse},
    models::PaymentMethod,
    services::{record_checkout_session, CheckoutProvider},
    AppState,
};

/// Start a payment for an order with the chosen provider.
///
/// Provider failures of any kind are reported as a generic 502; the details
/// only go to the logs.
pub async fn start_checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let order = state
        .repository
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    if order.is_paid() {
        return Err(AppError::Conflict(anyhow::anyhow!("Order is already paid")));
    }

    let provider: &dyn CheckoutProvider = match payload.provider {
        PaymentMethod::Paystack => &state.paystack,
        PaymentMethod::Stripe => &state.stripe,
    };
    let method = provider.method();

    tracing::info!(
        order_id = %order.id,
        provider = %method,
        total = %order.total,
        currency = %order.currency,
        "Initializing checkout"
    );

    let session = provider.create_checkout(&order).await.map_err(|e| {
        tracing::error!(
            order_id = %order.id,
            provider = %method,
            error = %e,
            "Checkout initialization failed"
        );
        record_checkout_session(method.as_str(), "failed");
        AppError::BadGateway("Payment initialization failed".to_string())
    })?;

    record_checkout_session(method.as_str(), "created");

    // The shopper already has a payable session; a failed write here only
    // loses the informational payment method.
    if let Err(e) = state.repository.record_payment_method(order.id, method).await {
        tracing::error!(order_id = %order.id, error = %e, "Failed to record payment method");
    }

    Ok(Json(CheckoutResponse {
        provider: session.provider,
        authorization_url: session.authorization_url,
        reference: session.reference,
    }))
}
