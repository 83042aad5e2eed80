//! Payment Webhook Application
//!
//! Maps post-verification provider events onto the order lifecycle.
//! Signature checking belongs to the provider collaborator; by the time an
//! event reaches this module it is trusted. Replayed events are no-ops
//! thanks to the payment_status = PENDING guard.

use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::repository::order;
use crate::orders::{collect_refundable_discount_ids, refund_discount_usage, restore_item_stock};
use crate::utils::{AppError, AppResult};
use shared::models::{Order, PaymentEvent, PaymentStatus};

/// Apply a provider payment event. Success confirms the order; failure
/// cancels it and restores stock. Events for already-settled orders are
/// acknowledged without mutation.
pub async fn apply_payment_event(
    pool: &SqlitePool,
    config: &Config,
    event: PaymentEvent,
    now: i64,
) -> AppResult<Order> {
    let existing = order::find_by_id(pool, event.order_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {} not found", event.order_id)))?;

    // Replay / late event: the order already left the PENDING payment state
    if existing.payment_status != PaymentStatus::Pending {
        tracing::info!(
            order_id = existing.id,
            payment_status = ?existing.payment_status,
            "Payment event for settled order ignored"
        );
        return Ok(existing);
    }

    if event.result_code == 0 {
        let mut tx = pool.begin().await?;
        order::mark_paid(&mut tx, event.order_id, event.transaction_id.as_deref(), now).await?;
        tx.commit().await?;
        tracing::info!(order_id = event.order_id, "Payment confirmed");
    } else {
        let items = order::find_items(pool, event.order_id).await?;
        let refund_ids =
            collect_refundable_discount_ids(pool, config, existing.discount_code.as_deref())
                .await?;

        let mut tx = pool.begin().await?;
        if order::mark_payment_failed(&mut tx, event.order_id, now).await? {
            restore_item_stock(&mut tx, &items).await?;
            refund_discount_usage(&mut tx, &refund_ids).await?;
        }
        tx.commit().await?;
        tracing::info!(
            order_id = event.order_id,
            result_code = event.result_code,
            "Payment failed, order cancelled"
        );
    }

    order::find_by_id(pool, event.order_id)
        .await?
        .ok_or_else(|| AppError::internal("Order vanished after payment event"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::{seed_product, seed_user, test_pool};
    use crate::orders::create_order;
    use shared::models::{CartLine, OrderCreate, OrderStatus, PaymentMethod};

    const NOW: i64 = 1_000_000;

    async fn setup_stripe_order(pool: &SqlitePool, config: &Config) -> i64 {
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
                discount_codes: None,
                payment_method: PaymentMethod::Stripe,
            },
            NOW,
        )
        .await
        .unwrap();
        detail.order.id
    }

    #[tokio::test]
    async fn test_success_event_confirms_and_records_transaction() {
        let pool = test_pool().await;
        let config = Config::with_overrides("./unused", 0);
        let order_id = setup_stripe_order(&pool, &config).await;

        let o = apply_payment_event(
            &pool,
            &config,
            PaymentEvent {
                order_id,
                result_code: 0,
                transaction_id: Some("pi_123".into()),
            },
            NOW + 1000,
        )
        .await
        .unwrap();

        assert_eq!(o.payment_status, PaymentStatus::Paid);
        assert_eq!(o.status, OrderStatus::Confirmed);
        assert_eq!(o.transaction_id.as_deref(), Some("pi_123"));

        // Paid orders keep their stock reservation
        let stock: i64 = sqlx::query_scalar("SELECT stock FROM product WHERE id = 10")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 3);
    }

    #[tokio::test]
    async fn test_failure_event_cancels_and_restores_stock() {
        let pool = test_pool().await;
        let config = Config::with_overrides("./unused", 0);
        let order_id = setup_stripe_order(&pool, &config).await;

        let o = apply_payment_event(
            &pool,
            &config,
            PaymentEvent {
                order_id,
                result_code: 1006,
                transaction_id: None,
            },
            NOW + 1000,
        )
        .await
        .unwrap();

        assert_eq!(o.payment_status, PaymentStatus::Failed);
        assert_eq!(o.status, OrderStatus::Cancelled);

        let stock: i64 = sqlx::query_scalar("SELECT stock FROM product WHERE id = 10")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 5);
    }

    #[tokio::test]
    async fn test_replayed_event_is_noop() {
        let pool = test_pool().await;
        let config = Config::with_overrides("./unused", 0);
        let order_id = setup_stripe_order(&pool, &config).await;

        apply_payment_event(
            &pool,
            &config,
            PaymentEvent {
                order_id,
                result_code: 0,
                transaction_id: Some("pi_123".into()),
            },
            NOW + 1000,
        )
        .await
        .unwrap();

        // A late failure event must not undo the successful payment
        let o = apply_payment_event(
            &pool,
            &config,
            PaymentEvent {
                order_id,
                result_code: 1006,
                transaction_id: None,
            },
            NOW + 2000,
        )
        .await
        .unwrap();

        assert_eq!(o.payment_status, PaymentStatus::Paid);
        assert_eq!(o.status, OrderStatus::Confirmed);

        let stock: i64 = sqlx::query_scalar("SELECT stock FROM product WHERE id = 10")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, 3);
    }

    #[tokio::test]
    async fn test_event_for_unknown_order_rejected() {
        let pool = test_pool().await;
        let config = Config::with_overrides("./unused", 0);

        let err = apply_payment_event(
            &pool,
            &config,
            PaymentEvent {
                order_id: 999,
                result_code: 0,
                transaction_id: None,
            },
            NOW,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
