//! Marking orders paid from provider notifications.
//!
//! Webhooks and the Paystack callback all end up here. Nothing in this path
//! is surfaced to the caller: the provider (or shopper) has already paid, so
//! an unknown order id or a failed write is logged and counted, and the
//! handler still answers normally.

use crate::models::ConfirmOutcome;
use crate::services::database::OrderRepository;
use crate::services::metrics::record_order_confirmation;
use chrono::Utc;
use uuid::Uuid;

/// Where a confirmation came from, used for logs and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationSource {
    PaystackWebhook,
    PaystackCallback,
    StripeWebhook,
}

impl ConfirmationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaystackWebhook => "paystack_webhook",
            Self::PaystackCallback => "paystack_callback",
            Self::StripeWebhook => "stripe_webhook",
        }
    }
}

/// Mark the order named by provider metadata as paid.
///
/// Returns `None` when the id is not a valid order id or the store write
/// failed; both cases have already been logged.
pub async fn confirm_order_payment(
    repository: &dyn OrderRepository,
    order_id: &str,
    payment_id: &str,
    source: ConfirmationSource,
) -> Option<ConfirmOutcome> {
    let Ok(id) = Uuid::parse_str(order_id.trim()) else {
        tracing::warn!(
            order_id = %order_id,
            source = source.as_str(),
            "Ignoring payment for unrecognised order id"
        );
        record_order_confirmation(source.as_str(), "invalid_order_id");
        return None;
    };

    match repository.confirm_payment(id, payment_id, Utc::now()).await {
        Ok(outcome) => {
            match &outcome {
                ConfirmOutcome::Confirmed(order) => tracing::info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    payment_id = %payment_id,
                    source = source.as_str(),
                    "Order marked as paid"
                ),
                ConfirmOutcome::AlreadyPaid(order) => tracing::info!(
                    order_id = %order.id,
                    payment_id = ?order.payment_id,
                    source = source.as_str(),
                    "Order already paid, leaving payment details unchanged"
                ),
                ConfirmOutcome::NotFound => tracing::warn!(
                    order_id = %id,
                    source = source.as_str(),
                    "Payment received for unknown order"
                ),
            }
            record_order_confirmation(source.as_str(), outcome.as_str());
            Some(outcome)
        }
        Err(e) => {
            tracing::error!(
                order_id = %id,
                payment_id = %payment_id,
                source = source.as_str(),
                error = %e,
                "Failed to mark order as paid"
            );
            record_order_confirmation(source.as_str(), "store_error");
            None
        }
    }
}
