//! Cancel Order (customer-initiated)
//!
//! Allowed only while the order is PENDING or CONFIRMED. The status flip
//! and the stock restoration commit together; discount usage is only given
//! back when the deployment opted in.

use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::repository::order;
use crate::orders::{collect_refundable_discount_ids, refund_discount_usage, restore_item_stock};
use crate::utils::{AppError, AppResult};
use shared::models::Order;

pub async fn cancel_order(
    pool: &SqlitePool,
    config: &Config,
    order_id: i64,
    user_id: i64,
    now: i64,
) -> AppResult<Order> {
    let existing = order::find_by_id(pool, order_id)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or_else(|| AppError::not_found(format!("Order {order_id} not found")))?;

    let items = order::find_items(pool, order_id).await?;
    let refund_ids =
        collect_refundable_discount_ids(pool, config, existing.discount_code.as_deref()).await?;

    let mut tx = pool.begin().await?;

    if !order::mark_cancelled(&mut tx, order_id, now).await? {
        return Err(AppError::business(
            "Order can only be cancelled while it is pending or confirmed",
        ));
    }

    restore_item_stock(&mut tx, &items).await?;
    refund_discount_usage(&mut tx, &refund_ids).await?;

    tx.commit().await?;

    tracing::info!(order_id, user_id, "Order cancelled by customer");

    order::find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| AppError::internal("Order vanished after cancellation"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::{DiscountFixture, seed_product, seed_user, test_pool};
    use crate::orders::create_order;
    use shared::models::{CartLine, OrderCreate, OrderStatus, PaymentMethod};

    const NOW: i64 = 1_000_000;

    async fn setup_order(pool: &SqlitePool, config: &Config, codes: Option<&str>) -> i64 {
        seed_user(pool, 1, "buyer@example.com", 0).await;
        seed_product(pool, 10, "Desk", 100.0, 5).await;
        let detail = create_order(
            pool,
            config,
            OrderCreate {
                user_id: 1,
                items: vec![CartLine {
                    product_id: 10,
                    variant_id: None,
                    quantity: 2,
                }],
                address_id: None,
                note: None,
                discount_codes: codes.map(String::from),
                payment_method: PaymentMethod::Cod,
            },
            NOW,
        )
        .await
        .unwrap();
        detail.order.id
    }

    #[tokio::test]
    async fn test_cancel_pending_restores_stock() {
        let pool = test_pool().await;
        let config = Config::with_overrides("./unused", 0);
        let order_id = setup_order(&pool, &config, None).await;

        // Stock was drained by the order
        let stock: i64 = sqlx::query_scalar("SELECT stock FROM product WHERE id = 10")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 3);

        let cancelled = cancel_order(&pool, &config, order_id, 1, NOW + 100)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let stock: i64 = sqlx::query_scalar("SELECT stock FROM product WHERE id = 10")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 5);
    }

    #[tokio::test]
    async fn test_cancel_shipped_rejected() {
        let pool = test_pool().await;
        let config = Config::with_overrides("./unused", 0);
        let order_id = setup_order(&pool, &config, None).await;
        sqlx::query("UPDATE orders SET status = 'SHIPPED' WHERE id = ?")
            .bind(order_id)
            .execute(&pool)
            .await
            .unwrap();

        let err = cancel_order(&pool, &config, order_id, 1, NOW + 100)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        // Stock stays drained
        let stock: i64 = sqlx::query_scalar("SELECT stock FROM product WHERE id = 10")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 3);
    }

    #[tokio::test]
    async fn test_cancel_other_users_order_hidden() {
        let pool = test_pool().await;
        let config = Config::with_overrides("./unused", 0);
        let order_id = setup_order(&pool, &config, None).await;
        seed_user(&pool, 2, "other@example.com", 0).await;

        let err = cancel_order(&pool, &config, order_id, 2, NOW + 100)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_keeps_discount_usage_by_default() {
        let pool = test_pool().await;
        let config = Config::with_overrides("./unused", 0);
        DiscountFixture::new(1, "TEN").percentage(10.0).seed(&pool).await;
        let order_id = setup_order(&pool, &config, Some("TEN")).await;

        cancel_order(&pool, &config, order_id, 1, NOW + 100)
            .await
            .unwrap();

        // First redemption sticks
        let used: i64 = sqlx::query_scalar("SELECT used_count FROM discount WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(used, 1);
    }

    #[tokio::test]
    async fn test_cancel_refunds_usage_when_configured() {
        let pool = test_pool().await;
        let mut config = Config::with_overrides("./unused", 0);
        config.refund_discount_usage_on_cancel = true;
        DiscountFixture::new(1, "TEN").percentage(10.0).seed(&pool).await;
        let order_id = setup_order(&pool, &config, Some("TEN")).await;

        cancel_order(&pool, &config, order_id, 1, NOW + 100)
            .await
            .unwrap();

        let used: i64 = sqlx::query_scalar("SELECT used_count FROM discount WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(used, 0);
    }
}
