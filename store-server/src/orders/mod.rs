//! Order Actions
//!
//! One file per checkout/lifecycle operation. Every mutating action runs
//! its writes inside a single transaction: stock, discount usage and the
//! order row succeed or fail together. Reads happen before the transaction
//! opens; the transaction itself only writes.

pub mod cancel_order;
pub mod create_order;
pub mod payment_expiry;
pub mod status;
pub mod webhook;

pub use cancel_order::cancel_order;
pub use create_order::create_order;
pub use status::update_status;
pub use webhook::apply_payment_event;

use crate::core::Config;
use crate::db::repository::{RepoResult, discount, product};
use shared::models::OrderItem;

/// Give back stock for every item of an order (variant when present, else
/// product). Runs inside the caller's cancellation/expiry transaction.
pub(crate) async fn restore_item_stock(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    items: &[OrderItem],
) -> RepoResult<()> {
    for item in items {
        match item.variant_id {
            Some(variant_id) => {
                product::restore_variant_stock(tx, variant_id, item.quantity).await?;
            }
            None => {
                product::restore_product_stock(tx, item.product_id, item.quantity).await?;
            }
        }
    }
    Ok(())
}

/// Discount ids whose usage should be given back when this order dies.
/// Empty unless the deployment opted in — the default keeps the first
/// redemption. Resolved before the transaction opens.
pub(crate) async fn collect_refundable_discount_ids(
    pool: &sqlx::SqlitePool,
    config: &Config,
    discount_code: Option<&str>,
) -> RepoResult<Vec<i64>> {
    if !config.refund_discount_usage_on_cancel {
        return Ok(vec![]);
    }
    let Some(csv) = discount_code else {
        return Ok(vec![]);
    };
    let codes: Vec<String> = csv
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    Ok(discount::find_by_codes(pool, &codes)
        .await?
        .into_iter()
        .map(|d| d.id)
        .collect())
}

/// Decrement usage counters collected by [`collect_refundable_discount_ids`].
pub(crate) async fn refund_discount_usage(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    discount_ids: &[i64],
) -> RepoResult<()> {
    for id in discount_ids {
        discount::decrement_used_count(tx, *id).await?;
    }
    Ok(())
}
