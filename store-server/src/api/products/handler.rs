//! Product API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::core::ServerState;
use crate::db::repository::product;
use crate::utils::validation::{MAX_NAME_LEN, MAX_NOTE_LEN, validate_optional_text, validate_positive_value, validate_required_text};
use crate::utils::{AppError, AppResult};
use shared::models::{
    Product, ProductCreate, ProductDetail, ProductUpdate, ProductVariant, ProductVariantCreate,
    ProductVariantUpdate,
};

/// GET /api/products - active catalog
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Product>>> {
    let products = product::find_all_active(&state.pool).await?;
    Ok(Json(products))
}

/// GET /api/products/{id} - product with its variants
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ProductDetail>> {
    let p = product::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))?;
    let variants = product::find_variants_by_product(&state.pool, id).await?;
    Ok(Json(ProductDetail {
        product: p,
        variants,
    }))
}

/// POST /api/products - create product
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ProductCreate>,
) -> AppResult<Json<Product>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&payload.description, "description", MAX_NOTE_LEN)?;
    validate_positive_value(payload.price, "price")?;

    let p = product::create(&state.pool, payload).await?;
    Ok(Json(p))
}

/// PUT /api/products/{id} - update product
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductUpdate>,
) -> AppResult<Json<Product>> {
    if let Some(ref name) = payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    if let Some(price) = payload.price {
        validate_positive_value(price, "price")?;
    }

    let p = product::update(&state.pool, id, payload).await?;
    Ok(Json(p))
}

/// DELETE /api/products/{id} - soft delete
pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let deleted = product::delete(&state.pool, id).await?;
    Ok(Json(deleted))
}

/// POST /api/products/{id}/variants - add a variant
pub async fn create_variant(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductVariantCreate>,
) -> AppResult<Json<ProductVariant>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_positive_value(payload.price, "price")?;

    product::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {id} not found")))?;

    let v = product::create_variant(&state.pool, id, payload).await?;
    Ok(Json(v))
}

/// PUT /api/products/variants/{id} - update a variant
pub async fn update_variant(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<ProductVariantUpdate>,
) -> AppResult<Json<ProductVariant>> {
    if let Some(price) = payload.price {
        validate_positive_value(price, "price")?;
    }
    let v = product::update_variant(&state.pool, id, payload).await?;
    Ok(Json(v))
}
