use crate::models::{OrderStatus, PaymentMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(email)]
    pub customer_email: String,
    pub total: Decimal,
    /// ISO 4217 code; stored upper-case.
    #[validate(length(equal = 3))]
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub provider: PaymentMethod,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub provider: PaymentMethod,
    pub authorization_url: String,
    pub reference: String,
}

/// Query string Paystack appends when redirecting the shopper back.
#[derive(Debug, Default, Deserialize)]
pub struct PaystackCallbackQuery {
    pub reference: Option<String>,
    pub trxref: Option<String>,
}

impl PaystackCallbackQuery {
    /// `reference`, falling back to `trxref`; blank values count as absent.
    pub fn reference(&self) -> Option<&str> {
        [self.reference.as_deref(), self.trxref.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|r| !r.is_empty())
    }
}
