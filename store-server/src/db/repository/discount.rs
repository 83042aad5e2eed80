//! Discount Repository
//!
//! Reads are pool-level; `used_count` mutations take the caller's
//! transaction so they commit (or roll back) with the order they belong to.

use super::{RepoError, RepoResult};
use shared::models::{Discount, DiscountCreate, DiscountScope, DiscountUpdate, normalize_code};
use sqlx::SqlitePool;

const DISCOUNT_COLS: &str = "id, code, description, discount_type, scope, method, is_stackable, value, min_order, max_uses, used_count, is_active, starts_at, expires_at, created_at, updated_at";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Discount>> {
    let rows = sqlx::query_as::<_, Discount>(&format!(
        "SELECT {DISCOUNT_COLS} FROM discount ORDER BY created_at DESC",
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Discount>> {
    let row = sqlx::query_as::<_, Discount>(&format!(
        "SELECT {DISCOUNT_COLS} FROM discount WHERE id = ?",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Lookup by customer-entered code (normalized to storage form first).
pub async fn find_by_code(pool: &SqlitePool, code: &str) -> RepoResult<Option<Discount>> {
    let normalized = normalize_code(code);
    let row = sqlx::query_as::<_, Discount>(&format!(
        "SELECT {DISCOUNT_COLS} FROM discount WHERE code = ?",
    ))
    .bind(normalized)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Batch lookup; unknown codes are absent from the result.
pub async fn find_by_codes(pool: &SqlitePool, codes: &[String]) -> RepoResult<Vec<Discount>> {
    if codes.is_empty() {
        return Ok(vec![]);
    }
    let normalized: Vec<String> = codes.iter().map(|c| normalize_code(c)).collect();
    let placeholders = vec!["?"; normalized.len()].join(", ");
    let sql = format!("SELECT {DISCOUNT_COLS} FROM discount WHERE code IN ({placeholders})");
    let mut query = sqlx::query_as::<_, Discount>(&sql);
    for code in &normalized {
        query = query.bind(code);
    }
    Ok(query.fetch_all(pool).await?)
}

/// Batch lookup by id; missing ids are absent from the result.
pub async fn find_by_ids(pool: &SqlitePool, ids: &[i64]) -> RepoResult<Vec<Discount>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!("SELECT {DISCOUNT_COLS} FROM discount WHERE id IN ({placeholders})");
    let mut query = sqlx::query_as::<_, Discount>(&sql);
    for id in ids {
        query = query.bind(id);
    }
    Ok(query.fetch_all(pool).await?)
}

/// Active AUTO discounts already filtered to their validity window.
/// Usage/minimum/eligibility gates run in the engine.
pub async fn find_active_auto(pool: &SqlitePool, now: i64) -> RepoResult<Vec<Discount>> {
    let rows = sqlx::query_as::<_, Discount>(&format!(
        "SELECT {DISCOUNT_COLS} FROM discount WHERE method = 'AUTO' AND is_active = 1 AND (starts_at IS NULL OR starts_at <= ?) AND (expires_at IS NULL OR expires_at >= ?) ORDER BY created_at",
    ))
    .bind(now)
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Eligible product ids for a PRODUCT-scoped discount.
pub async fn find_product_ids(pool: &SqlitePool, discount_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT product_id FROM discount_product WHERE discount_id = ?",
    )
    .bind(discount_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn create(pool: &SqlitePool, data: DiscountCreate) -> RepoResult<Discount> {
    let code = normalize_code(&data.code);
    if find_by_code(pool, &code).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Discount '{code}' already exists"
        )));
    }

    let product_ids = data.product_ids.unwrap_or_default();
    if data.scope == DiscountScope::Product && product_ids.is_empty() {
        return Err(RepoError::Validation(
            "PRODUCT-scoped discount requires at least one eligible product".into(),
        ));
    }

    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO discount (id, code, description, discount_type, scope, method, is_stackable, value, min_order, max_uses, used_count, is_active, starts_at, expires_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 1, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&code)
    .bind(&data.description)
    .bind(data.discount_type)
    .bind(data.scope)
    .bind(data.method)
    .bind(data.is_stackable.unwrap_or(false))
    .bind(data.value)
    .bind(data.min_order)
    .bind(data.max_uses)
    .bind(data.starts_at)
    .bind(data.expires_at)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    replace_products(&mut tx, id, &product_ids).await?;

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create discount".into()))
}

pub async fn update(pool: &SqlitePool, id: i64, data: DiscountUpdate) -> RepoResult<Discount> {
    let now = shared::util::now_millis();

    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "UPDATE discount SET description = COALESCE(?, description), discount_type = COALESCE(?, discount_type), scope = COALESCE(?, scope), method = COALESCE(?, method), is_stackable = COALESCE(?, is_stackable), value = COALESCE(?, value), min_order = COALESCE(?, min_order), max_uses = COALESCE(?, max_uses), is_active = COALESCE(?, is_active), starts_at = COALESCE(?, starts_at), expires_at = COALESCE(?, expires_at), updated_at = ? WHERE id = ?",
    )
    .bind(&data.description)
    .bind(data.discount_type)
    .bind(data.scope)
    .bind(data.method)
    .bind(data.is_stackable)
    .bind(data.value)
    .bind(data.min_order)
    .bind(data.max_uses)
    .bind(data.is_active)
    .bind(data.starts_at)
    .bind(data.expires_at)
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Discount {id} not found")));
    }

    if let Some(ref product_ids) = data.product_ids {
        replace_products(&mut tx, id, product_ids).await?;
    }

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Discount {id} not found")))
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows =
        sqlx::query("UPDATE discount SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1")
            .bind(now)
            .bind(id)
            .execute(pool)
            .await?;
    Ok(rows.rows_affected() > 0)
}

/// Increment usage inside the order transaction. Guarded by `max_uses`, so
/// a concurrent order that exhausted the discount fails the guard instead
/// of over-committing it.
pub async fn increment_used_count(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: i64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE discount SET used_count = used_count + 1, updated_at = ? WHERE id = ? AND (max_uses IS NULL OR used_count < max_uses)",
    )
    .bind(now)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Give back one usage (only called when refund-on-cancel is configured).
pub async fn decrement_used_count(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: i64,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE discount SET used_count = MAX(0, used_count - 1), updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn replace_products(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    discount_id: i64,
    product_ids: &[i64],
) -> RepoResult<()> {
    sqlx::query("DELETE FROM discount_product WHERE discount_id = ?")
        .bind(discount_id)
        .execute(&mut **tx)
        .await?;
    for pid in product_ids {
        sqlx::query("INSERT INTO discount_product (discount_id, product_id) VALUES (?, ?)")
            .bind(discount_id)
            .bind(pid)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
