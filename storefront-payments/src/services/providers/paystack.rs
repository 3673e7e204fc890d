//! Paystack client.
//!
//! Implements transaction initialisation and verification against the
//! Paystack REST API, and HMAC-SHA512 webhook authentication.

use super::{
    metadata_order_id, CheckoutProvider, CheckoutSession, ProviderError, ProviderId,
    SignatureError,
};
use crate::config::PaystackConfig;
use crate::models::{Order, PaymentMethod};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::json;
use service_core::utils::signature::{digests_match, hmac_sha512_hex};
use std::time::Duration;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Event type for a successful charge.
pub const CHARGE_SUCCESS: &str = "charge.success";

#[derive(Clone)]
pub struct PaystackClient {
    client: Client,
    config: PaystackConfig,
    callback_url: String,
}

/// Paystack wraps every API response in this envelope.
#[derive(Debug, Deserialize)]
pub struct PaystackResponse<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    /// Minor units (kobo for NGN).
    amount: i64,
    currency: &'a str,
    callback_url: &'a str,
    metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub reference: String,
}

/// Transaction object as returned by verify and embedded in charge events.
///
/// Only the fields used to find and confirm the order are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: Option<ProviderId>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl Transaction {
    pub fn is_successful(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    pub fn order_id(&self) -> Option<String> {
        metadata_order_id(self.metadata.as_ref())
    }

    /// Reference stored on the order once paid: the Paystack transaction id,
    /// falling back to the transaction reference.
    pub fn payment_id(&self) -> Option<String> {
        self.id
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| self.reference.clone())
    }
}

/// Webhook event envelope.
///
/// `data` differs per event type (refunds, transfers, disputes...), so it is
/// kept untyped until the event is known to be a charge.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WebhookEvent {
    /// Read `data` as a transaction, for `charge.*` events.
    pub fn transaction(&self) -> Result<Transaction, serde_json::Error> {
        Transaction::deserialize(&self.data)
    }
}

impl PaystackClient {
    pub fn new(
        config: PaystackConfig,
        callback_url: String,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            config,
            callback_url,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Start a transaction and get the hosted payment page URL.
    pub async fn initialize_transaction(
        &self,
        order: &Order,
    ) -> Result<InitializeData, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured("paystack"));
        }

        let amount = order.amount_minor_units().ok_or_else(|| {
            ProviderError::InvalidRequest(format!("Order total {} is not payable", order.total))
        })?;

        let request = InitializeRequest {
            email: &order.customer_email,
            amount,
            currency: &order.currency,
            callback_url: &self.callback_url,
            metadata: json!({
                "orderId": order.id.to_string(),
                "orderNumber": order.order_number,
            }),
        };

        let url = format!("{}/transaction/initialize", self.base_url());

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let data = Self::read_envelope::<InitializeData>(response).await?;

        tracing::info!(
            order_id = %order.id,
            reference = %data.reference,
            "Paystack transaction initialized"
        );

        Ok(data)
    }

    /// Server-side verification of a transaction by reference.
    pub async fn verify_transaction(&self, reference: &str) -> Result<Transaction, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::NotConfigured("paystack"));
        }

        let mut url = reqwest::Url::parse(&self.base_url())
            .map_err(|e| ProviderError::InvalidRequest(format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidRequest("Invalid base URL".to_string()))?
            .pop_if_empty()
            .extend(["transaction", "verify", reference]);

        let response = self
            .client
            .get(url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        let transaction = Self::read_envelope::<Transaction>(response).await?;

        tracing::debug!(
            reference = %reference,
            status = ?transaction.status,
            "Paystack transaction verified"
        );

        Ok(transaction)
    }

    /// Authenticate a webhook body against `x-paystack-signature`.
    ///
    /// The signature is the hex HMAC-SHA512 of the raw body keyed by the
    /// secret key, so this must run before the body is parsed.
    pub fn verify_webhook_signature(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), SignatureError> {
        if !self.is_configured() {
            return Err(SignatureError::NotConfigured);
        }
        let signature = signature
            .filter(|s| !s.trim().is_empty())
            .ok_or(SignatureError::Missing)?;

        let expected = hmac_sha512_hex(self.config.secret_key.expose_secret().as_bytes(), body)
            .map_err(|_| SignatureError::NotConfigured)?;

        if digests_match(&expected, signature) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    pub fn parse_webhook_event(&self, body: &[u8]) -> Result<WebhookEvent, serde_json::Error> {
        serde_json::from_slice(body)
    }

    fn base_url(&self) -> String {
        self.config.api_base_url.trim_end_matches('/').to_string()
    }

    async fn read_envelope<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<PaystackResponse<serde_json::Value>>(&body)
                .map(|r| r.message)
                .unwrap_or(body);
            tracing::error!(status = %status, message = %message, "Paystack API error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: PaystackResponse<T> = serde_json::from_str(&body)
            .map_err(|e| ProviderError::UnexpectedResponse(e.to_string()))?;

        if !envelope.status {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: envelope.message,
            });
        }

        envelope
            .data
            .ok_or_else(|| ProviderError::UnexpectedResponse("missing data".to_string()))
    }
}

#[async_trait]
impl CheckoutProvider for PaystackClient {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Paystack
    }

    fn is_configured(&self) -> bool {
        PaystackClient::is_configured(self)
    }

    async fn create_checkout(&self, order: &Order) -> Result<CheckoutSession, ProviderError> {
        let data = self.initialize_transaction(order).await?;
        Ok(CheckoutSession {
            provider: PaymentMethod::Paystack,
            authorization_url: data.authorization_url,
            reference: data.reference,
        })
    }
}
