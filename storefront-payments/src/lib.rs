pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use std::sync::Arc;

use config::StorefrontConfig;
use services::{OrderRepository, PaystackClient, StripeClient};

pub use startup::Application;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: StorefrontConfig,
    pub repository: Arc<dyn OrderRepository>,
    pub paystack: PaystackClient,
    pub stripe: StripeClient,
}
