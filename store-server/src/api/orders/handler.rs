//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::repository::order;
use crate::orders;
use crate::utils::{AppError, AppResult};
use shared::models::{Order, OrderCreate, OrderDetail, OrderStatusUpdate};

/// POST /api/orders - checkout commit
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<OrderDetail>> {
    let now = shared::util::now_millis();
    let detail = orders::create_order(&state.pool, &state.config, payload, now).await?;
    // Payment-session creation for STRIPE/MOMO happens after this commit,
    // driven by the storefront against the provider SDK.
    Ok(Json(detail))
}

/// GET /api/orders - all orders (admin)
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Order>>> {
    let rows = order::find_all(&state.pool).await?;
    Ok(Json(rows))
}

/// GET /api/orders/user/{user_id} - order history
pub async fn list_by_user(
    State(state): State<ServerState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<Order>>> {
    let rows = order::find_by_user(&state.pool, user_id).await?;
    Ok(Json(rows))
}

/// GET /api/orders/{id} - order with items
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderDetail>> {
    let o = order::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
    let items = order::find_items(&state.pool, id).await?;
    Ok(Json(OrderDetail { order: o, items }))
}

/// Cancellation request (acting user travels in the body, auth is out of
/// scope for this service)
#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub user_id: i64,
}

/// POST /api/orders/{id}/cancel - customer cancellation
pub async fn cancel(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<CancelOrderRequest>,
) -> AppResult<Json<Order>> {
    let now = shared::util::now_millis();
    let o = orders::cancel_order(&state.pool, &state.config, id, payload.user_id, now).await?;
    Ok(Json(o))
}

/// PUT /api/orders/{id}/status - admin fulfillment transition
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<OrderStatusUpdate>,
) -> AppResult<Json<Order>> {
    let now = shared::util::now_millis();
    let o = orders::update_status(&state.pool, id, payload.status, now).await?;
    Ok(Json(o))
}
