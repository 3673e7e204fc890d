//! Stripe webhook.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;

use super::WebhookRejection;
use crate::{
    services::{
        confirm_order_payment,
        providers::stripe::{
            CheckoutSessionObject, PaymentIntentObject, CHECKOUT_SESSION_COMPLETED,
            PAYMENT_INTENT_FAILED, SIGNATURE_HEADER,
        },
        record_webhook_event, ConfirmationSource,
    },
    AppState,
};

const PROVIDER: &str = "stripe";

fn event_label(event_type: &str) -> &'static str {
    match event_type {
        CHECKOUT_SESSION_COMPLETED => CHECKOUT_SESSION_COMPLETED,
        PAYMENT_INTENT_FAILED => PAYMENT_INTENT_FAILED,
        _ => "other",
    }
}

/// Stripe event notification. Same contract as the Paystack webhook, except
/// that signature failures are answered with 400.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookRejection> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = state
        .stripe
        .verify_webhook_signature(&body, signature, Utc::now().timestamp())
    {
        tracing::warn!(reason = %e, "Rejected Stripe webhook");
        record_webhook_event(PROVIDER, "unknown", "rejected");
        return Err(WebhookRejection::InvalidSignature(StatusCode::BAD_REQUEST));
    }

    let event = state.stripe.parse_webhook_event(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse Stripe webhook");
        record_webhook_event(PROVIDER, "unknown", "invalid_payload");
        WebhookRejection::InvalidPayload
    })?;

    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        "Processing Stripe webhook"
    );

    let outcome = match event.event_type.as_str() {
        CHECKOUT_SESSION_COMPLETED => {
            match serde_json::from_value::<CheckoutSessionObject>(event.data.object) {
                Ok(session) if session.awaiting_payment() => {
                    tracing::info!(
                        session_id = %session.id,
                        order_id = ?session.order_id(),
                        "Checkout session completed before payment settled"
                    );
                    "ignored"
                }
                Ok(session) => match session.order_id() {
                    Some(order_id) => {
                        confirm_order_payment(
                            state.repository.as_ref(),
                            order_id,
                            session.payment_id(),
                            ConfirmationSource::StripeWebhook,
                        )
                        .await;
                        "processed"
                    }
                    None => {
                        tracing::warn!(
                            session_id = %session.id,
                            "Completed checkout session without an order id"
                        );
                        "ignored"
                    }
                },
                Err(e) => {
                    tracing::error!(
                        event_id = %event.id,
                        error = %e,
                        "Malformed checkout session object"
                    );
                    "ignored"
                }
            }
        }
        PAYMENT_INTENT_FAILED => {
            match serde_json::from_value::<PaymentIntentObject>(event.data.object) {
                Ok(intent) => tracing::warn!(
                    payment_intent = %intent.id,
                    order_id = ?intent.order_id(),
                    reason = ?intent.failure_message(),
                    "Stripe payment failed"
                ),
                Err(e) => tracing::error!(
                    event_id = %event.id,
                    error = %e,
                    "Malformed payment intent object"
                ),
            }
            "ignored"
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring Stripe event");
            "ignored"
        }
    };

    record_webhook_event(PROVIDER, event_label(&event.event_type), outcome);

    Ok(StatusCode::OK)
}
