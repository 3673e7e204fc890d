//! Paystack webhook and shopper callback.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::WebhookRejection;
use crate::{
    dtos::PaystackCallbackQuery,
    services::{
        confirm_order_payment,
        providers::paystack::{CHARGE_SUCCESS, SIGNATURE_HEADER},
        record_webhook_event, ConfirmationSource,
    },
    AppState,
};

const PROVIDER: &str = "paystack";

fn event_label(event: &str) -> &'static str {
    match event {
        CHARGE_SUCCESS => CHARGE_SUCCESS,
        _ => "other",
    }
}

/// Paystack event notification.
///
/// The signature is checked against the raw body before anything is parsed.
/// Once it passes the answer is always 200, so Paystack does not redeliver
/// events we chose to ignore or failed to store.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, WebhookRejection> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = state.paystack.verify_webhook_signature(&body, signature) {
        tracing::warn!(reason = %e, "Rejected Paystack webhook");
        record_webhook_event(PROVIDER, "unknown", "rejected");
        return Err(WebhookRejection::InvalidSignature(StatusCode::UNAUTHORIZED));
    }

    let event = state.paystack.parse_webhook_event(&body).map_err(|e| {
        tracing::error!(error = %e, "Failed to parse Paystack webhook");
        record_webhook_event(PROVIDER, "unknown", "invalid_payload");
        WebhookRejection::InvalidPayload
    })?;

    tracing::info!(event_type = %event.event, "Processing Paystack webhook");

    let outcome = match event.event.as_str() {
        CHARGE_SUCCESS => match event.transaction() {
            Ok(transaction) => match (transaction.order_id(), transaction.payment_id()) {
                (Some(order_id), Some(payment_id)) => {
                    confirm_order_payment(
                        state.repository.as_ref(),
                        &order_id,
                        &payment_id,
                        ConfirmationSource::PaystackWebhook,
                    )
                    .await;
                    "processed"
                }
                _ => {
                    tracing::warn!(
                        reference = ?transaction.reference,
                        "charge.success without an order id, nothing to update"
                    );
                    "ignored"
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "charge.success data is not a transaction");
                "ignored"
            }
        },
        other => {
            tracing::debug!(event_type = %other, "Ignoring Paystack event");
            "ignored"
        }
    };

    record_webhook_event(PROVIDER, event_label(&event.event), outcome);

    Ok(StatusCode::OK)
}

/// Where Paystack sends the shopper after the hosted payment page.
///
/// The query string is not trusted: the transaction is re-verified with
/// Paystack before the order is touched.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<PaystackCallbackQuery>,
) -> Response {
    let urls = &state.config.urls;

    let Some(reference) = query.reference() else {
        tracing::debug!("Paystack callback without a reference");
        return redirect(urls.site("/"));
    };

    let transaction = match state.paystack.verify_transaction(reference).await {
        Ok(transaction) if transaction.is_successful() => transaction,
        Ok(transaction) => {
            tracing::warn!(
                reference = %reference,
                status = ?transaction.status,
                "Paystack transaction not successful"
            );
            return redirect(urls.site("/checkout?error=payment_failed"));
        }
        Err(e) => {
            tracing::error!(reference = %reference, error = %e, "Paystack verification failed");
            return redirect(urls.site("/checkout?error=payment_failed"));
        }
    };

    let success_url = urls.site("/checkout/success");

    match transaction.order_id() {
        Some(order_id) => {
            let payment_id = transaction
                .payment_id()
                .unwrap_or_else(|| reference.to_string());
            confirm_order_payment(
                state.repository.as_ref(),
                &order_id,
                &payment_id,
                ConfirmationSource::PaystackCallback,
            )
            .await;
            redirect(with_query(&success_url, "order_id", &order_id))
        }
        None => {
            tracing::warn!(reference = %reference, "Verified Paystack transaction has no order id");
            redirect(success_url)
        }
    }
}

fn with_query(base: &str, key: &str, value: &str) -> String {
    match reqwest::Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair(key, value);
            url.into()
        }
        Err(_) => format!("{}?{}={}", base, key, value),
    }
}

/// 302 Found, which browsers follow with a GET.
fn redirect(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}
