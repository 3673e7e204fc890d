//! Stripe client.
//!
//! Creates hosted Checkout Sessions and authenticates webhook deliveries.
//! Webhooks are signed with the `Stripe-Signature` scheme: HMAC-SHA256 over
//! `"{timestamp}.{raw body}"` with the endpoint's signing secret.

use super::{CheckoutProvider, CheckoutSession, ProviderError, SignatureError};
use crate::config::StripeConfig;
use crate::models::{Order, PaymentMethod};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use service_core::utils::signature::{digests_match, hmac_sha256_hex};
use std::collections::HashMap;
use std::time::Duration;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
    success_url: String,
    cancel_url: String,
}

/// The subset of a Checkout Session we read back after creation.
#[derive(Debug, Deserialize)]
pub struct CreatedSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Webhook event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// `data.object` of a `checkout.session.completed` event.
#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSessionObject {
    pub fn order_id(&self) -> Option<&str> {
        self.metadata
            .get("orderId")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// The payment intent is the durable reference; sessions without one
    /// fall back to the session id.
    pub fn payment_id(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }

    /// Delayed methods (bank debits, vouchers) complete the session while
    /// `payment_status` is still `unpaid`.
    pub fn awaiting_payment(&self) -> bool {
        self.payment_status.as_deref() == Some("unpaid")
    }
}

/// `data.object` of a `payment_intent.*` event.
#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub last_payment_error: Option<serde_json::Value>,
}

impl PaymentIntentObject {
    pub fn order_id(&self) -> Option<&str> {
        self.metadata
            .get("orderId")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.last_payment_error
            .as_ref()
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
    }
}

/// Parsed `Stripe-Signature` header.
#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_signature_header(header: &str) -> Result<SignatureHeader<'_>, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::Malformed)?,
                )
            }
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    match timestamp {
        Some(timestamp) if !signatures.is_empty() => Ok(SignatureHeader {
            timestamp,
            signatures,
        }),
        _ => Err(SignatureError::Malformed),
    }
}

impl StripeClient {
    pub fn new(
        config: StripeConfig,
        success_url: String,
        cancel_url: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            config,
            success_url,
            cancel_url,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Create a Checkout Session for the order's full total.
    pub async fn create_checkout_session(
        &self,
        order: &Order,
    ) -> Result<CreatedSession, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured("stripe"));
        }

        let amount = order.amount_minor_units().ok_or_else(|| {
            ProviderError::InvalidRequest(format!("Order total {} is not payable", order.total))
        })?;

        let order_id = order.id.to_string();
        // `{CHECKOUT_SESSION_ID}` is substituted by Stripe on redirect.
        let success_url = format!(
            "{}?order_id={}&session_id={{CHECKOUT_SESSION_ID}}",
            self.success_url, order_id
        );
        let product_name = format!("Order {}", order.order_number);
        let amount = amount.to_string();
        let currency = order.currency.to_lowercase();

        let params = [
            ("mode", "payment"),
            ("customer_email", order.customer_email.as_str()),
            ("success_url", success_url.as_str()),
            ("cancel_url", self.cancel_url.as_str()),
            ("line_items[0][quantity]", "1"),
            ("line_items[0][price_data][currency]", currency.as_str()),
            ("line_items[0][price_data][unit_amount]", amount.as_str()),
            (
                "line_items[0][price_data][product_data][name]",
                product_name.as_str(),
            ),
            ("metadata[orderId]", order_id.as_str()),
            ("metadata[orderNumber]", order.order_number.as_str()),
            ("payment_intent_data[metadata][orderId]", order_id.as_str()),
        ];

        let url = format!(
            "{}/v1/checkout/sessions",
            self.config.api_base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or(body);
            tracing::error!(status = %status, message = %message, "Stripe API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CreatedSession = serde_json::from_str(&body)
            .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;

        tracing::info!(
            order_id = %order.id,
            session_id = %session.id,
            "Stripe checkout session created"
        );

        Ok(session)
    }

    /// Authenticate a webhook payload against its `Stripe-Signature` header.
    ///
    /// `now` is the current unix time; deliveries whose timestamp is further
    /// than the configured tolerance from it are rejected.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<(), SignatureError> {
        let secret = self.config.webhook_secret.expose_secret();
        if secret.is_empty() {
            return Err(SignatureError::NotConfigured);
        }
        let header = header
            .filter(|h| !h.trim().is_empty())
            .ok_or(SignatureError::Missing)?;
        let parsed = parse_signature_header(header)?;

        let mut signed_payload = format!("{}.", parsed.timestamp).into_bytes();
        signed_payload.extend_from_slice(payload);
        let expected = hmac_sha256_hex(secret.as_bytes(), &signed_payload)
            .map_err(|_| SignatureError::NotConfigured)?;

        if !parsed
            .signatures
            .iter()
            .any(|candidate| digests_match(&expected, candidate))
        {
            return Err(SignatureError::Mismatch);
        }

        if now.abs_diff(parsed.timestamp) > self.config.webhook_tolerance_secs.unsigned_abs() {
            return Err(SignatureError::Expired);
        }

        Ok(())
    }

    pub fn parse_webhook_event(&self, payload: &[u8]) -> Result<WebhookEvent, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Stripe
    }

    fn is_configured(&self) -> bool {
        StripeClient::is_configured(self)
    }

    async fn create_checkout(&self, order: &Order) -> Result<CheckoutSession, ProviderError> {
        let session = self.create_checkout_session(order).await?;
        let authorization_url = session.url.ok_or_else(|| {
            ProviderError::UnexpectedResponse("checkout session has no url".to_string())
        })?;
        Ok(CheckoutSession {
            provider: PaymentMethod::Stripe,
            authorization_url,
            reference: session.id,
        })
    }
}
