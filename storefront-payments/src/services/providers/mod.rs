//! Hosted-payment provider integrations.
//!
//! Both providers expose the same checkout seam ([`CheckoutProvider`]) so the
//! checkout handler does not care which one the shopper picked. Webhook and
//! callback handling is provider specific and lives on the concrete clients.

pub mod paystack;
pub mod stripe;

use crate::models::{Order, PaymentMethod};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use paystack::PaystackClient;
pub use stripe::StripeClient;

/// Error type for provider API calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Why an inbound webhook failed authentication.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,

    #[error("signature header malformed")]
    Malformed,

    #[error("signature timestamp outside tolerance")]
    Expired,

    #[error("signature mismatch")]
    Mismatch,

    #[error("webhook secret not configured")]
    NotConfigured,
}

/// A payable transaction created at the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub provider: PaymentMethod,
    /// Hosted payment page the shopper is redirected to.
    pub authorization_url: String,
    /// Provider-side reference (Paystack reference / Stripe session id).
    pub reference: String,
}

#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    fn method(&self) -> PaymentMethod;

    fn is_configured(&self) -> bool;

    /// Create a transaction for `order` carrying its id in metadata, so the
    /// webhook and callback can find the order again.
    async fn create_checkout(&self, order: &Order) -> Result<CheckoutSession, ProviderError>;
}

/// Provider transaction ids arrive as JSON numbers (Paystack) or strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProviderId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Pull `orderId` out of provider metadata.
///
/// Metadata may be an object, a JSON-encoded object in a string, or an empty
/// string when none was attached.
pub fn metadata_order_id(metadata: Option<&serde_json::Value>) -> Option<String> {
    let value = match metadata? {
        serde_json::Value::String(raw) if raw.trim().is_empty() => return None,
        serde_json::Value::String(raw) => serde_json::from_str::<serde_json::Value>(raw).ok()?,
        other => other.clone(),
    };

    match value.get("orderId")? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_id_renders_numbers_as_decimal() {
        let id: ProviderId = serde_json::from_value(json!(12345)).unwrap();
        assert_eq!(id.to_string(), "12345");

        let id: ProviderId = serde_json::from_value(json!("pi_3abc")).unwrap();
        assert_eq!(id.to_string(), "pi_3abc");
    }

    #[test]
    fn order_id_from_object_metadata() {
        let metadata = json!({ "orderId": "order_1", "orderNumber": "ORD-1" });
        assert_eq!(
            metadata_order_id(Some(&metadata)),
            Some("order_1".to_string())
        );
    }

    #[test]
    fn order_id_from_string_encoded_metadata() {
        let metadata = json!("{\"orderId\":\"order_2\"}");
        assert_eq!(
            metadata_order_id(Some(&metadata)),
            Some("order_2".to_string())
        );
    }

    #[test]
    fn missing_or_empty_metadata_has_no_order_id() {
        assert_eq!(metadata_order_id(None), None);
        assert_eq!(metadata_order_id(Some(&json!(""))), None);
        assert_eq!(metadata_order_id(Some(&json!({}))), None);
        assert_eq!(metadata_order_id(Some(&json!({ "orderId": "" }))), None);
        assert_eq!(metadata_order_id(Some(&json!(null))), None);
    }
}
