//! Services module for storefront-payments.

pub mod confirmation;
pub mod database;
pub mod metrics;
pub mod providers;

pub use confirmation::{confirm_order_payment, ConfirmationSource};
pub use database::{Database, OrderRepository};
pub use metrics::{
    get_metrics, init_metrics, record_checkout_session, record_order_confirmation,
    record_webhook_event,
};
pub use providers::{CheckoutProvider, PaystackClient, StripeClient};
