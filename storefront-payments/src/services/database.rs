//! Order persistence.
//!
//! Handlers only see [`OrderRepository`]; [`Database`] is the PostgreSQL
//! implementation used in production.

use crate::models::{ConfirmOutcome, NewOrder, Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::services::metrics::DB_QUERY_DURATION;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, order_number, customer_email, total, currency, status, \
     payment_status, payment_id, paid_at, payment_method, created_at, updated_at";

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Liveness probe for the backing store.
    async fn health_check(&self) -> Result<(), AppError>;

    async fn create_order(&self, input: &NewOrder) -> Result<Order, AppError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError>;

    /// Remember which provider the shopper was sent to.
    async fn record_payment_method(
        &self,
        id: Uuid,
        method: PaymentMethod,
    ) -> Result<Option<Order>, AppError>;

    /// Mark an order paid and confirmed.
    ///
    /// Only the first confirmation writes; later ones (webhook redelivery, or
    /// the callback racing the webhook) report `AlreadyPaid` and leave
    /// `paid_at`/`payment_id` untouched.
    async fn confirm_payment(
        &self,
        id: Uuid,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, AppError>;

    /// Overwrite the fulfilment status. Transition rules are checked by the caller.
    async fn update_status(&self, id: Uuid, status: OrderStatus)
        -> Result<Option<Order>, AppError>;
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "storefront-payments"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for Database {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    #[instrument(skip(self, input), fields(order_number = %input.order_number))]
    async fn create_order(&self, input: &NewOrder) -> Result<Order, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_order"])
            .start_timer();

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (id, order_number, customer_email, total, currency, status, payment_status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&input.order_number)
        .bind(&input.customer_email)
        .bind(input.total)
        .bind(&input.currency)
        .bind(OrderStatus::Pending.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Order number '{}' already exists",
                    input.order_number
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create order: {}", e)),
        })?;

        timer.observe_duration();

        info!(order_id = %order.id, "Order created");

        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_order"])
            .start_timer();

        let order =
            sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get order: {}", e))
                })?;

        timer.observe_duration();

        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id, payment_method = %method))]
    async fn record_payment_method(
        &self,
        id: Uuid,
        method: PaymentMethod,
    ) -> Result<Option<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment_method"])
            .start_timer();

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET payment_method = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(method.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to record payment method: {}", e))
        })?;

        timer.observe_duration();

        Ok(order)
    }

    #[instrument(skip(self), fields(order_id = %id, payment_id = %payment_id))]
    async fn confirm_payment(
        &self,
        id: Uuid,
        payment_id: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<ConfirmOutcome, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["confirm_payment"])
            .start_timer();

        // Conditional on payment_status so concurrent webhook/callback
        // deliveries cannot move paid_at after the first confirmation.
        let updated = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $2,
                payment_status = $3,
                payment_id = $4,
                paid_at = $5,
                updated_at = NOW()
            WHERE id = $1 AND payment_status <> $3
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(OrderStatus::Confirmed.as_str())
        .bind(PaymentStatus::Paid.as_str())
        .bind(payment_id)
        .bind(paid_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to confirm payment: {}", e)))?;

        let outcome = match updated {
            Some(order) => ConfirmOutcome::Confirmed(order),
            None => match self.get_order(id).await? {
                Some(order) => ConfirmOutcome::AlreadyPaid(order),
                None => ConfirmOutcome::NotFound,
            },
        };

        timer.observe_duration();

        info!(outcome = outcome.as_str(), "Order payment confirmation applied");

        Ok(outcome)
    }

    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Option<Order>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_status"])
            .start_timer();

        let order = sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update status: {}", e)))?;

        timer.observe_duration();

        Ok(order)
    }
}
