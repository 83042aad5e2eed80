//! Admin Status Update
//!
//! Direct fulfillment transition used by the back office. Independent of
//! the payment sub-state; no stock or usage side effects fire here.

use sqlx::SqlitePool;

use crate::db::repository::order;
use crate::utils::{AppError, AppResult};
use shared::models::{Order, OrderStatus};

pub async fn update_status(
    pool: &SqlitePool,
    order_id: i64,
    status: OrderStatus,
    now: i64,
) -> AppResult<Order> {
    order::set_status(pool, order_id, status, now).await?;

    tracing::info!(order_id, status = ?status, "Order status updated by admin");

    order::find_by_id(pool, order_id)
        .await?
        .ok_or_else(|| AppError::internal("Order vanished after status update"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::{seed_user, test_pool};

    #[tokio::test]
    async fn test_admin_can_move_through_fulfillment_states() {
        let pool = test_pool().await;
        seed_user(&pool, 1, "buyer@example.com", 0).await;
        sqlx::query(
            "INSERT INTO orders (id, user_id, subtotal, shipping_cost, tax, discount_amount, total, payment_method, payment_status, status, currency, created_at, updated_at) VALUES (1, 1, 100, 0, 8, 0, 108, 'COD', 'PENDING', 'PENDING', 'USD', 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            let o = update_status(&pool, 1, status, 10).await.unwrap();
            assert_eq!(o.status, status);
        }
    }

    #[tokio::test]
    async fn test_unknown_order_rejected() {
        let pool = test_pool().await;
        let err = update_status(&pool, 999, OrderStatus::Confirmed, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
