//! Payment Expiry Sweep
//!
//! Invoked on an interval by the background scheduler: every STRIPE/MOMO
//! order still unpaid past its payment window is expired, cancelled and
//! its stock restored. The payment_status = PENDING guard makes a repeated
//! run over the same order a no-op.

use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::repository::order;
use crate::orders::{collect_refundable_discount_ids, refund_discount_usage, restore_item_stock};
use crate::utils::AppResult;

/// Expire lapsed unpaid orders; returns how many were cancelled.
/// Each order commits in its own transaction, so one failure does not
/// hold back the rest of the sweep.
pub async fn sweep(pool: &SqlitePool, config: &Config, now: i64) -> AppResult<u64> {
    let expired = order::find_expired_pending(pool, now).await?;
    let mut cancelled = 0u64;

    for o in expired {
        let items = order::find_items(pool, o.id).await?;
        let refund_ids =
            collect_refundable_discount_ids(pool, config, o.discount_code.as_deref()).await?;

        let mut tx = pool.begin().await?;

        // Re-check under the transaction: another writer (webhook, earlier
        // sweep) may have settled this order in the meantime.
        if !order::mark_payment_expired(&mut tx, o.id, now).await? {
            continue;
        }

        restore_item_stock(&mut tx, &items).await?;
        refund_discount_usage(&mut tx, &refund_ids).await?;

        tx.commit().await?;

        tracing::info!(order_id = o.id, "Unpaid order expired and cancelled");
        cancelled += 1;
    }

    Ok(cancelled)
}
