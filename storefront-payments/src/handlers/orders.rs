//! Order endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{CreateOrderRequest, UpdateOrderStatusRequest},
    models::{NewOrder, Order},
    AppState,
};

/// Create a pending, unpaid order.
pub async fn create_order(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    payload.validate()?;

    if payload.total <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Order total must be greater than zero"
        )));
    }

    let input = NewOrder::new(payload.customer_email, payload.total, payload.currency);
    let order = state.repository.create_order(&input).await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        total = %order.total,
        currency = %order.currency,
        "Order created"
    );

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .repository
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    Ok(Json(order))
}

/// Move an order along its fulfilment lifecycle.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .repository
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    if !order.status.can_transition_to(payload.status) {
        tracing::warn!(
            order_id = %id,
            from = %order.status,
            to = %payload.status,
            "Rejected order status transition"
        );
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Cannot move order from {} to {}",
            order.status,
            payload.status
        )));
    }

    let updated = state
        .repository
        .update_status(id, payload.status)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Order not found")))?;

    tracing::info!(
        order_id = %id,
        from = %order.status,
        to = %updated.status,
        "Order status updated"
    );

    Ok(Json(updated))
}
