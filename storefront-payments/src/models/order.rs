//! Order model and its fulfilment/payment lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fulfilment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether an order may move from `self` to `next`.
    ///
    /// `pending -> confirmed -> shipped -> delivered`, with cancellation
    /// allowed until the parcel ships. Re-applying the current status is
    /// accepted so admin retries are harmless.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        self == next
            || matches!(
                (self, next),
                (Pending, Confirmed)
                    | (Confirmed, Shipped)
                    | (Shipped, Delivered)
                    | (Pending, Cancelled)
                    | (Confirmed, Cancelled)
            )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

/// Which hosted-payment provider took (or is taking) the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Paystack,
    Stripe,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paystack => "paystack",
            Self::Stripe => "stripe",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_email: String,
    pub total: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_method: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Total in the currency's minor unit (kobo, cents), as providers expect.
    ///
    /// Returns `None` for non-positive totals or values that do not fit an `i64`.
    pub fn amount_minor_units(&self) -> Option<i64> {
        if self.total <= Decimal::ZERO {
            return None;
        }
        (self.total * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }
}

/// Input for creating a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_email: String,
    pub total: Decimal,
    pub currency: String,
}

impl NewOrder {
    /// Build a new order with a generated `ORD-YYYYMMDD-XXXXXX` number.
    pub fn new(customer_email: String, total: Decimal, currency: String) -> Self {
        Self {
            order_number: generate_order_number(Utc::now()),
            customer_email,
            total,
            currency: currency.to_uppercase(),
        }
    }
}

pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

/// Result of trying to mark an order as paid.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// The order moved to paid by this call.
    Confirmed(Order),
    /// The order was already paid; nothing was written.
    AlreadyPaid(Order),
    NotFound,
}

impl ConfirmOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed(_) => "confirmed",
            Self::AlreadyPaid(_) => "already_paid",
            Self::NotFound => "not_found",
        }
    }
}
