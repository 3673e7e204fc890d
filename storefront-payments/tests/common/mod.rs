#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::Secret;
use service_core::config::Config as CommonConfig;
use service_core::error::AppError;
use service_core::utils::signature::{hmac_sha256_hex, hmac_sha512_hex};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use storefront_payments::config::{
    DatabaseConfig, PaystackConfig, StorefrontConfig, StripeConfig, UrlConfig,
};
use storefront_payments::models::{
    ConfirmOutcome, NewOrder, Order, OrderStatus, PaymentMethod, PaymentStatus,
};
use storefront_payments::services::OrderRepository;
use storefront_payments::startup::Application;
use tokio::sync::RwLock;
use uuid::Uuid;
use wiremock::MockServer;

pub const PAYSTACK_SECRET: &str = "sk_test_paystack";
pub const STRIPE_SECRET: &str = "sk_test_stripe";
pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_test";
pub const SITE_URL: &str = "http://shop.test";
pub const PUBLIC_API_URL: &str = "http://api.test";

/// Order store kept in memory so the HTTP surface can be exercised without
/// PostgreSQL. Mirrors the conditional confirm of the SQL implementation.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, Order>>,
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_order(&self, input: &NewOrder) -> Result<Order, AppError> {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            order_number: input.order_number.clone(),
            customer_email: input.customer_email.clone(),
            total: input.total,
            currency: input.currency.clone(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            paid_at: None,
            payment_method: None,
            created_at: now,
            updated_at: now,
        };
        self.orders.write().await.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn record_payment_method(
        &self,
        id: Uuid,
        method: PaymentMethod,
    ) -> Result<Option<Order>, AppError> {
        let mut orders = self.orders.write().await;
        Ok(orders.get_mut(&id).map(|order| {
            order.payment_method = Some(method);
            order.updated_at = Utc::now();
            order.clone()
        }))
    }

    async fn confirm_payment(
        &self,
        id: Uuid,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, AppError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(&id) else {
            return Ok(ConfirmOutcome::NotFound);
        };
        if order.is_paid() {
            return Ok(ConfirmOutcome::AlreadyPaid(order.clone()));
        }
        order.status = OrderStatus::Confirmed;
        order.payment_status = PaymentStatus::Paid;
        order.payment_id = Some(payment_id.to_string());
        order.paid_at = Some(paid_at);
        order.updated_at = Utc::now();
        Ok(ConfirmOutcome::Confirmed(order.clone()))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, AppError> {
        let mut orders = self.orders.write().await;
        Ok(orders.get_mut(&id).map(|order| {
            order.status = status;
            order.updated_at = Utc::now();
            order.clone()
        }))
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub repository: Arc<InMemoryOrderRepository>,
    pub paystack_server: MockServer,
    pub stripe_server: MockServer,
    /// Does not follow redirects, so callback responses can be inspected.
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let paystack_server = MockServer::start().await;
        let stripe_server = MockServer::start().await;

        let config = StorefrontConfig {
            common: CommonConfig {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 0, // Random port
            },
            service_name: "storefront-payments-test".to_string(),
            log_level: "warn".to_string(),
            otlp_endpoint: None,
            database: DatabaseConfig {
                url: Secret::new("postgres://unused".to_string()),
                max_connections: 1,
                min_connections: 0,
            },
            urls: UrlConfig {
                site_url: SITE_URL.to_string(),
                public_api_url: PUBLIC_API_URL.to_string(),
            },
            paystack: PaystackConfig {
                secret_key: Secret::new(PAYSTACK_SECRET.to_string()),
                api_base_url: paystack_server.uri(),
            },
            stripe: StripeConfig {
                secret_key: Secret::new(STRIPE_SECRET.to_string()),
                webhook_secret: Secret::new(STRIPE_WEBHOOK_SECRET.to_string()),
                api_base_url: stripe_server.uri(),
                webhook_tolerance_secs: 300,
            },
            provider_timeout: Duration::from_secs(5),
        };

        let repository = Arc::new(InMemoryOrderRepository::default());

        let app = Application::build_with_repository(config, repository.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        // Wait for the server to accept connections
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            repository,
            paystack_server,
            stripe_server,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Insert a pending order straight into the store.
    pub async fn seed_order(&self, total: &str, currency: &str) -> Order {
        let input = NewOrder::new(
            "shopper@example.com".to_string(),
            Decimal::from_str(total).expect("Invalid total"),
            currency.to_string(),
        );
        self.repository
            .create_order(&input)
            .await
            .expect("Failed to seed order")
    }

    pub async fn order(&self, id: Uuid) -> Order {
        self.repository
            .get_order(id)
            .await
            .expect("Failed to read order")
            .expect("Order not found")
    }

    pub async fn post_paystack_webhook(
        &self,
        body: &str,
        signature: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self
            .client
            .post(self.url("/api/webhooks/paystack"))
            .header("content-type", "application/json")
            .body(body.to_string());
        if let Some(signature) = signature {
            request = request.header("x-paystack-signature", signature);
        }
        request.send().await.expect("Failed to execute request")
    }

    pub async fn post_stripe_webhook(
        &self,
        body: &str,
        signature: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self
            .client
            .post(self.url("/api/webhooks/stripe"))
            .header("content-type", "application/json")
            .body(body.to_string());
        if let Some(signature) = signature {
            request = request.header("stripe-signature", signature);
        }
        request.send().await.expect("Failed to execute request")
    }
}

pub fn paystack_signature(body: &str) -> String {
    hmac_sha512_hex(PAYSTACK_SECRET.as_bytes(), body.as_bytes()).expect("Failed to sign body")
}

pub fn stripe_signature(body: &str, timestamp: i64) -> String {
    let signed = format!("{}.{}", timestamp, body);
    let signature = hmac_sha256_hex(STRIPE_WEBHOOK_SECRET.as_bytes(), signed.as_bytes())
        .expect("Failed to sign body");
    format!("t={},v1={}", timestamp, signature)
}

pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("Missing location header")
}
