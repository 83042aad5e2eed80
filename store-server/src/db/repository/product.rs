//! Product Repository
//!
//! Catalog reads plus the transactional stock mutations used by the order
//! actions. Stock changes always run inside the caller's transaction.

use super::{RepoError, RepoResult};
use shared::models::{
    Product, ProductCreate, ProductUpdate, ProductVariant, ProductVariantCreate,
    ProductVariantUpdate,
};
use sqlx::SqlitePool;

const PRODUCT_COLS: &str =
    "id, name, description, price, stock, is_active, created_at, updated_at";
const VARIANT_COLS: &str = "id, product_id, name, price, stock, is_active";

pub async fn find_all_active(pool: &SqlitePool) -> RepoResult<Vec<Product>> {
    let rows = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLS} FROM product WHERE is_active = 1 ORDER BY created_at DESC",
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Product>> {
    let row = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLS} FROM product WHERE id = ?",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Batch read by id; missing ids are simply absent from the result.
pub async fn find_by_ids(pool: &SqlitePool, ids: &[i64]) -> RepoResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql =
        format!("SELECT {PRODUCT_COLS} FROM product WHERE id IN ({placeholders})");
    let mut query = sqlx::query_as::<_, Product>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    Ok(query.fetch_all(pool).await?)
}

pub async fn create(pool: &SqlitePool, data: ProductCreate) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO product (id, name, description, price, stock, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.stock.unwrap_or(0))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create product".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: ProductUpdate) -> RepoResult<Product> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE product SET name = COALESCE(?, name), description = COALESCE(?, description), price = COALESCE(?, price), stock = COALESCE(?, stock), is_active = COALESCE(?, is_active), updated_at = ? WHERE id = ?",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(data.price)
    .bind(data.stock)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Product {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))
}

/// Soft delete: the product disappears from the storefront but order items
/// keep referencing it.
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE product SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

// ── Variants ─────────────────────────────────────────────────

pub async fn find_variants_by_product(
    pool: &SqlitePool,
    product_id: i64,
) -> RepoResult<Vec<ProductVariant>> {
    let rows = sqlx::query_as::<_, ProductVariant>(&format!(
        "SELECT {VARIANT_COLS} FROM product_variant WHERE product_id = ? AND is_active = 1",
    ))
    .bind(product_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_variant_by_id(
    pool: &SqlitePool,
    id: i64,
) -> RepoResult<Option<ProductVariant>> {
    let row = sqlx::query_as::<_, ProductVariant>(&format!(
        "SELECT {VARIANT_COLS} FROM product_variant WHERE id = ?",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_variants_by_ids(
    pool: &SqlitePool,
    ids: &[i64],
) -> RepoResult<Vec<ProductVariant>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT {VARIANT_COLS} FROM product_variant WHERE id IN ({placeholders})");
    let mut query = sqlx::query_as::<_, ProductVariant>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    Ok(query.fetch_all(pool).await?)
}

pub async fn create_variant(
    pool: &SqlitePool,
    product_id: i64,
    data: ProductVariantCreate,
) -> RepoResult<ProductVariant> {
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO product_variant (id, product_id, name, price, stock, is_active) VALUES (?, ?, ?, ?, ?, 1)",
    )
    .bind(id)
    .bind(product_id)
    .bind(&data.name)
    .bind(data.price)
    .bind(data.stock.unwrap_or(0))
    .execute(pool)
    .await?;

    find_variant_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create variant".into()))
}

pub async fn update_variant(
    pool: &SqlitePool,
    id: i64,
    data: ProductVariantUpdate,
) -> RepoResult<ProductVariant> {
    let rows = sqlx::query(
        "UPDATE product_variant SET name = COALESCE(?, name), price = COALESCE(?, price), stock = COALESCE(?, stock), is_active = COALESCE(?, is_active) WHERE id = ?",
    )
    .bind(&data.name)
    .bind(data.price)
    .bind(data.stock)
    .bind(data.is_active)
    .bind(id)
    .execute(pool)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Variant {id} not found")));
    }
    find_variant_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Variant {id} not found")))
}

// ── Stock mutations (transactional) ──────────────────────────

/// Conditional decrement: fails (returns false) when stock is short.
/// The guard re-checks availability at write time, so a concurrent order
/// that drained the stock surfaces here instead of going negative.
pub async fn try_decrement_product_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    product_id: i64,
    quantity: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE product SET stock = stock - ? WHERE id = ? AND stock >= ?")
        .bind(quantity)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut **tx)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn try_decrement_variant_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    variant_id: i64,
    quantity: i64,
) -> RepoResult<bool> {
    let rows =
        sqlx::query("UPDATE product_variant SET stock = stock - ? WHERE id = ? AND stock >= ?")
            .bind(quantity)
            .bind(variant_id)
            .bind(quantity)
            .execute(&mut **tx)
            .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn restore_product_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    product_id: i64,
    quantity: i64,
) -> RepoResult<()> {
    sqlx::query("UPDATE product SET stock = stock + ? WHERE id = ?")
        .bind(quantity)
        .bind(product_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn restore_variant_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    variant_id: i64,
    quantity: i64,
) -> RepoResult<()> {
    sqlx::query("UPDATE product_variant SET stock = stock + ? WHERE id = ?")
        .bind(quantity)
        .bind(variant_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
