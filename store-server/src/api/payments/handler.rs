//! Payment Webhook Handler
//!
//! Receives provider callbacks whose signatures were already verified by
//! the provider integration in front of this service. The payload shape is
//! the provider-neutral event defined in shared::models.

use axum::{Json, extract::State};

use crate::core::ServerState;
use crate::orders;
use crate::utils::AppResult;
use shared::models::{Order, PaymentEvent};

/// POST /api/payments/webhook - apply a payment result
pub async fn webhook(
    State(state): State<ServerState>,
    Json(event): Json<PaymentEvent>,
) -> AppResult<Json<Order>> {
    let now = shared::util::now_millis();
    let o = orders::apply_payment_event(&state.pool, &state.config, event, now).await?;
    Ok(Json(o))
}
