//! Order Repository
//!
//! Row access plus the guarded status transitions used by the lifecycle
//! actions. Transition guards live in the WHERE clause so replayed events
//! and double sweeps become no-ops instead of double mutations.

use super::{RepoError, RepoResult};
use shared::models::{Order, OrderItem, OrderStatus};
use sqlx::SqlitePool;

const ORDER_COLS: &str = "id, user_id, address_id, note, subtotal, shipping_cost, tax, discount_amount, total, discount_id, discount_code, payment_method, payment_status, status, currency, payment_expiry, transaction_id, created_at, updated_at";
const ITEM_COLS: &str = "id, order_id, product_id, variant_id, product_name, quantity, price";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let row = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLS} FROM orders WHERE id = ?",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<Order>> {
    let rows = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLS} FROM orders WHERE user_id = ? ORDER BY created_at DESC",
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Order>> {
    let rows = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLS} FROM orders ORDER BY created_at DESC",
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_items(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderItem>> {
    let rows = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLS} FROM order_item WHERE order_id = ? ORDER BY id",
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Unpaid provider orders whose payment window has lapsed.
pub async fn find_expired_pending(pool: &SqlitePool, now: i64) -> RepoResult<Vec<Order>> {
    let rows = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLS} FROM orders WHERE payment_status = 'PENDING' AND payment_method IN ('STRIPE', 'MOMO') AND payment_expiry IS NOT NULL AND payment_expiry < ?",
    ))
    .bind(now)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ── Transactional writes ─────────────────────────────────────

/// Insert the order row inside the checkout transaction.
pub async fn insert(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order: &Order,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO orders (id, user_id, address_id, note, subtotal, shipping_cost, tax, discount_amount, total, discount_id, discount_code, payment_method, payment_status, status, currency, payment_expiry, transaction_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(order.address_id)
    .bind(&order.note)
    .bind(order.subtotal)
    .bind(order.shipping_cost)
    .bind(order.tax)
    .bind(order.discount_amount)
    .bind(order.total)
    .bind(order.discount_id)
    .bind(&order.discount_code)
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(order.status)
    .bind(&order.currency)
    .bind(order.payment_expiry)
    .bind(&order.transaction_id)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    item: &OrderItem,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO order_item (id, order_id, product_id, variant_id, product_name, quantity, price) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(item.id)
    .bind(item.order_id)
    .bind(item.product_id)
    .bind(item.variant_id)
    .bind(&item.product_name)
    .bind(item.quantity)
    .bind(item.price)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Cancel from an early fulfillment state. Returns false when the order
/// has already progressed past {PENDING, CONFIRMED}.
pub async fn mark_cancelled(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET status = 'CANCELLED', updated_at = ? WHERE id = ? AND status IN ('PENDING', 'CONFIRMED')",
    )
    .bind(now)
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Expire an unpaid provider order. Guarded by payment_status = PENDING,
/// which is what makes the sweep idempotent.
pub async fn mark_payment_expired(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET payment_status = 'EXPIRED', status = 'CANCELLED', updated_at = ? WHERE id = ? AND payment_status = 'PENDING'",
    )
    .bind(now)
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Record a successful provider payment. Guarded by payment_status =
/// PENDING so replayed webhooks are no-ops.
pub async fn mark_paid(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    transaction_id: Option<&str>,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET payment_status = 'PAID', status = 'CONFIRMED', transaction_id = ?, updated_at = ? WHERE id = ? AND payment_status = 'PENDING'",
    )
    .bind(transaction_id)
    .bind(now)
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Record a failed provider payment.
pub async fn mark_payment_failed(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE orders SET payment_status = 'FAILED', status = 'CANCELLED', updated_at = ? WHERE id = ? AND payment_status = 'PENDING'",
    )
    .bind(now)
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Admin fulfillment transition: unguarded, no side effects.
pub async fn set_status(
    pool: &SqlitePool,
    order_id: i64,
    status: OrderStatus,
    now: i64,
) -> RepoResult<()> {
    let rows = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now)
        .bind(order_id)
        .execute(pool)
        .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!("Order {order_id} not found")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::{seed_product, seed_user, test_pool};
    use shared::models::{OrderStatus, PaymentMethod, PaymentStatus};

    async fn seed_order(pool: &SqlitePool, id: i64, status: &str, payment_status: &str) {
        sqlx::query(
            "INSERT INTO orders (id, user_id, subtotal, shipping_cost, tax, discount_amount, total, payment_method, payment_status, status, currency, payment_expiry, created_at, updated_at) VALUES (?, 1, 100, 0, 8, 0, 108, 'STRIPE', ?, ?, 'USD', 500, 0, 0)",
        )
        .bind(id)
        .bind(payment_status)
        .bind(status)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_read_roundtrip() {
        let pool = test_pool().await;
        seed_user(&pool, 1, "a@example.com", 0).await;
        seed_product(&pool, 10, "A", 25.0, 5).await;

        let order = Order {
            id: 1,
            user_id: 1,
            address_id: None,
            note: Some("leave at door".into()),
            subtotal: 50.0,
            shipping_cost: 10.0,
            tax: 4.0,
            discount_amount: 0.0,
            total: 64.0,
            discount_id: None,
            discount_code: None,
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            currency: "USD".into(),
            payment_expiry: None,
            transaction_id: None,
            created_at: 1000,
            updated_at: 1000,
        };
        let item = OrderItem {
            id: 2,
            order_id: 1,
            product_id: 10,
            variant_id: None,
            product_name: "A".into(),
            quantity: 2,
            price: 25.0,
        };

        let mut tx = pool.begin().await.unwrap();
        insert(&mut tx, &order).await.unwrap();
        insert_item(&mut tx, &item).await.unwrap();
        tx.commit().await.unwrap();

        let found = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(found.total, 64.0);
        assert_eq!(found.payment_method, PaymentMethod::Cod);

        let items = find_items(&pool, 1).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_mark_cancelled_guards_late_states() {
        let pool = test_pool().await;
        seed_user(&pool, 1, "a@example.com", 0).await;
        seed_order(&pool, 1, "SHIPPED", "PAID").await;
        seed_order(&pool, 2, "PENDING", "PENDING").await;

        let mut tx = pool.begin().await.unwrap();
        assert!(!mark_cancelled(&mut tx, 1, 10).await.unwrap());
        assert!(mark_cancelled(&mut tx, 2, 10).await.unwrap());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_mark_paid_is_replay_safe() {
        let pool = test_pool().await;
        seed_user(&pool, 1, "a@example.com", 0).await;
        seed_order(&pool, 1, "PENDING", "PENDING").await;

        let mut tx = pool.begin().await.unwrap();
        assert!(mark_paid(&mut tx, 1, Some("tx-1"), 10).await.unwrap());
        tx.commit().await.unwrap();

        // Replayed event finds payment_status != PENDING
        let mut tx = pool.begin().await.unwrap();
        assert!(!mark_paid(&mut tx, 1, Some("tx-1"), 20).await.unwrap());
        tx.commit().await.unwrap();

        let o = find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(o.payment_status, PaymentStatus::Paid);
        assert_eq!(o.status, OrderStatus::Confirmed);
        assert_eq!(o.transaction_id.as_deref(), Some("tx-1"));
    }

    #[tokio::test]
    async fn test_find_expired_pending_filters() {
        let pool = test_pool().await;
        seed_user(&pool, 1, "a@example.com", 0).await;
        seed_order(&pool, 1, "PENDING", "PENDING").await; // expiry 500
        seed_order(&pool, 2, "PENDING", "PAID").await;

        let expired = find_expired_pending(&pool, 1000).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, 1);

        // Before the window lapses nothing matches
        let not_yet = find_expired_pending(&pool, 100).await.unwrap();
        assert!(not_yet.is_empty());
    }
}
