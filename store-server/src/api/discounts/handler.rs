//! Discount API Handlers
//!
//! The apply/auto endpoints run the engine against the submitted cart and
//! return computed applications; they never mutate anything. Usage counts
//! only move inside the order commit.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::db::repository::discount;
use crate::pricing::DiscountEngine;
use crate::utils::validation::{
    MAX_CODE_LEN, MAX_NOTE_LEN, validate_cart_lines, validate_optional_text,
    validate_positive_value, validate_required_text,
};
use crate::utils::{AppError, AppResult};
use shared::models::{
    AppliedDiscount, CartLine, CodeApplication, Discount, DiscountCreate, DiscountDetail,
    DiscountScope, DiscountType, DiscountUpdate,
};

/// Manual code application request
#[derive(Debug, Deserialize)]
pub struct ApplyDiscountRequest {
    pub user_id: i64,
    pub code: String,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub existing_discount_ids: Vec<i64>,
}

/// Auto-apply surfacing request
#[derive(Debug, Deserialize)]
pub struct AutoApplyRequest {
    pub items: Vec<CartLine>,
}

/// POST /api/discounts/apply - validate a customer-entered code
pub async fn apply(
    State(state): State<ServerState>,
    Json(payload): Json<ApplyDiscountRequest>,
) -> AppResult<Json<CodeApplication>> {
    validate_required_text(&payload.code, "code", MAX_CODE_LEN)?;
    validate_cart_lines(&payload.items)?;

    let engine = DiscountEngine::new(state.pool.clone());
    let now = shared::util::now_millis();
    let result = engine
        .apply_code(
            &payload.code,
            &payload.items,
            &payload.existing_discount_ids,
            payload.user_id,
            now,
        )
        .await?;
    Ok(Json(result))
}

/// POST /api/discounts/auto - surface automatic discounts for a cart
pub async fn auto_apply(
    State(state): State<ServerState>,
    Json(payload): Json<AutoApplyRequest>,
) -> AppResult<Json<Vec<AppliedDiscount>>> {
    validate_cart_lines(&payload.items)?;

    let engine = DiscountEngine::new(state.pool.clone());
    let now = shared::util::now_millis();
    let applied = engine.auto_apply(&payload.items, now).await?;
    Ok(Json(applied))
}

/// GET /api/discounts - all discounts (admin)
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Discount>>> {
    let discounts = discount::find_all(&state.pool).await?;
    Ok(Json(discounts))
}

/// GET /api/discounts/{id} - discount with its eligibility set
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DiscountDetail>> {
    let d = discount::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Discount {id} not found")))?;
    let product_ids = discount::find_product_ids(&state.pool, id).await?;
    Ok(Json(DiscountDetail {
        discount: d,
        product_ids,
    }))
}

/// POST /api/discounts - create discount (admin)
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<DiscountCreate>,
) -> AppResult<Json<Discount>> {
    validate_payload(
        &payload.code,
        payload.discount_type,
        payload.scope,
        payload.value,
        &payload.description,
        payload.product_ids.as_deref(),
    )?;

    let d = discount::create(&state.pool, payload).await?;
    Ok(Json(d))
}

/// PUT /api/discounts/{id} - update discount (admin)
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<DiscountUpdate>,
) -> AppResult<Json<Discount>> {
    if let (Some(discount_type), Some(value)) = (payload.discount_type, payload.value) {
        validate_value(discount_type, value)?;
    }
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;

    let d = discount::update(&state.pool, id, payload).await?;
    Ok(Json(d))
}

/// DELETE /api/discounts/{id} - deactivate (admin)
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let deleted = discount::delete(&state.pool, id).await?;
    Ok(Json(deleted))
}

fn validate_payload(
    code: &str,
    discount_type: DiscountType,
    scope: DiscountScope,
    value: f64,
    description: &Option<String>,
    product_ids: Option<&[i64]>,
) -> AppResult<()> {
    validate_required_text(code, "code", MAX_CODE_LEN)?;
    validate_optional_text(description, "description", MAX_NOTE_LEN)?;
    validate_value(discount_type, value)?;
    if scope == DiscountScope::Product && product_ids.is_none_or(|ids| ids.is_empty()) {
        return Err(AppError::validation(
            "PRODUCT-scoped discount requires at least one eligible product",
        ));
    }
    Ok(())
}

fn validate_value(discount_type: DiscountType, value: f64) -> AppResult<()> {
    validate_positive_value(value, "value")?;
    if discount_type == DiscountType::Percentage && value > 100.0 {
        return Err(AppError::validation("Percentage value must be at most 100"));
    }
    Ok(())
}
