//! Create Order (checkout commit)
//!
//! Re-validates everything the client claims — product availability, stock,
//! prices, discounts — against the live catalog, then persists the order,
//! the stock decrements and the discount usage increments in one
//! transaction. Client-side totals and discount amounts are never trusted;
//! whatever the storefront displayed is recomputed here and the server
//! value wins.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::repository::{discount, order, product, user};
use crate::pricing::{calculator, check_discount_gates};
use crate::pricing::calculator::PricedLine;
use crate::utils::{AppError, AppResult, validation};
use shared::models::{
    Discount, Order, OrderCreate, OrderDetail, OrderItem, OrderStatus, PaymentStatus,
};

/// A cart line resolved against the catalog, ready to commit.
struct ResolvedLine {
    product_id: i64,
    variant_id: Option<i64>,
    product_name: String,
    unit_price: f64,
    quantity: i64,
}

impl ResolvedLine {
    fn priced(&self) -> PricedLine {
        PricedLine {
            product_id: self.product_id,
            variant_id: self.variant_id,
            unit_price: self.unit_price,
            quantity: self.quantity,
        }
    }
}

/// Full checkout commit. Validation and business-rule failures come back
/// as typed errors with user-readable messages; nothing is persisted
/// unless every step succeeds.
pub async fn create_order(
    pool: &SqlitePool,
    config: &Config,
    input: OrderCreate,
    now: i64,
) -> AppResult<OrderDetail> {
    validation::validate_cart_lines(&input.items)?;
    validation::validate_optional_text(&input.note, "note", validation::MAX_NOTE_LEN)?;

    user::find_by_id(pool, input.user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", input.user_id)))?;

    // 1-3. Resolve lines, check stock, snapshot prices
    let lines = resolve_and_check_stock(pool, &input).await?;
    let priced: Vec<PricedLine> = lines.iter().map(ResolvedLine::priced).collect();
    let subtotal = calculator::cart_subtotal(&priced);

    // 4. Server-side discount resolution — the client-sent codes are only
    // candidates; every gate runs again here.
    let accepted = resolve_discounts(pool, &input, &priced, subtotal, now).await?;
    let amounts: Vec<f64> = accepted.iter().map(|(_, amount)| *amount).collect();
    let discount_amount = calculator::total_discount(&amounts, subtotal);

    // 5. Totals (shipping threshold, tax rate are business policy)
    let shipping_cost = calculator::shipping_cost(subtotal);
    let tax = calculator::tax_amount(subtotal, discount_amount);
    let total = calculator::order_total(subtotal, discount_amount, shipping_cost, tax);

    // 7. Payment branch
    let payment_method = input.payment_method;
    let payment_expiry = payment_method
        .requires_payment_session()
        .then(|| now + config.payment_expiry_minutes * 60_000);

    let order_row = Order {
        id: shared::util::snowflake_id(),
        user_id: input.user_id,
        address_id: input.address_id,
        note: input.note.clone(),
        subtotal,
        shipping_cost,
        tax,
        discount_amount,
        total,
        discount_id: accepted.first().map(|(d, _)| d.id),
        discount_code: if accepted.is_empty() {
            None
        } else {
            Some(
                accepted
                    .iter()
                    .map(|(d, _)| d.code.clone())
                    .collect::<Vec<_>>()
                    .join(","),
            )
        },
        payment_method,
        payment_status: PaymentStatus::Pending,
        status: OrderStatus::Pending,
        currency: payment_method.currency().to_string(),
        payment_expiry,
        transaction_id: None,
        created_at: now,
        updated_at: now,
    };

    let items: Vec<OrderItem> = lines
        .iter()
        .map(|l| OrderItem {
            id: shared::util::snowflake_id(),
            order_id: order_row.id,
            product_id: l.product_id,
            variant_id: l.variant_id,
            product_name: l.product_name.clone(),
            quantity: l.quantity,
            price: l.unit_price,
        })
        .collect();

    // 6. Atomic commit: stock, usage counters, order + items
    let mut tx = pool.begin().await?;

    for line in &lines {
        let decremented = match line.variant_id {
            Some(variant_id) => {
                product::try_decrement_variant_stock(&mut tx, variant_id, line.quantity).await?
            }
            None => {
                product::try_decrement_product_stock(&mut tx, line.product_id, line.quantity)
                    .await?
            }
        };
        if !decremented {
            // Pre-check passed but a concurrent order won the race
            return Err(AppError::business(format!(
                "Insufficient stock for {}",
                line.product_name
            )));
        }
    }

    for (d, _) in &accepted {
        if !discount::increment_used_count(&mut tx, d.id).await? {
            return Err(AppError::business(format!(
                "Discount {} has reached its usage limit",
                d.code
            )));
        }
    }

    order::insert(&mut tx, &order_row).await?;
    for item in &items {
        order::insert_item(&mut tx, item).await?;
    }

    tx.commit().await?;

    tracing::info!(
        order_id = order_row.id,
        user_id = order_row.user_id,
        total = order_row.total,
        method = ?order_row.payment_method,
        "Order created"
    );

    Ok(OrderDetail {
        order: order_row,
        items,
    })
}

/// Resolve every line against live products/variants. Unlike checkout-page
/// evaluation, a missing or inactive product here fails the whole order —
/// no partial orders.
async fn resolve_and_check_stock(
    pool: &SqlitePool,
    input: &OrderCreate,
) -> AppResult<Vec<ResolvedLine>> {
    let product_ids: Vec<i64> = input.items.iter().map(|l| l.product_id).collect();
    let variant_ids: Vec<i64> = input.items.iter().filter_map(|l| l.variant_id).collect();

    let products: HashMap<i64, _> = product::find_by_ids(pool, &product_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let variants: HashMap<i64, _> = product::find_variants_by_ids(pool, &variant_ids)
        .await?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    let mut lines = Vec::with_capacity(input.items.len());
    for cart_line in &input.items {
        let p = products
            .get(&cart_line.product_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| {
                AppError::business(format!(
                    "Product {} is no longer available",
                    cart_line.product_id
                ))
            })?;

        let (unit_price, available) = match cart_line.variant_id {
            Some(vid) => {
                let v = variants
                    .get(&vid)
                    .filter(|v| v.product_id == p.id && v.is_active)
                    .ok_or_else(|| {
                        AppError::business(format!(
                            "Selected option for {} is no longer available",
                            p.name
                        ))
                    })?;
                (v.price, v.stock)
            }
            None => (p.price, p.stock),
        };

        if available < cart_line.quantity {
            return Err(AppError::business(format!(
                "Insufficient stock for {}. Available: {}",
                p.name, available
            )));
        }

        lines.push(ResolvedLine {
            product_id: cart_line.product_id,
            variant_id: cart_line.variant_id,
            product_name: p.name.clone(),
            unit_price,
            quantity: cart_line.quantity,
        });
    }

    Ok(lines)
}

/// Re-run the discount gates over the submitted codes and keep the ones
/// that still qualify, each paired with its computed amount.
///
/// Single code: stackability is irrelevant. Multiple codes: every
/// non-stackable entry is individually excluded (skipped, not fatal).
/// Unknown, inactive and gate-failing codes are likewise skipped — the
/// order still goes through, just without them.
async fn resolve_discounts(
    pool: &SqlitePool,
    input: &OrderCreate,
    priced: &[PricedLine],
    subtotal: f64,
    now: i64,
) -> AppResult<Vec<(Discount, f64)>> {
    let Some(csv) = input.discount_codes.as_deref() else {
        return Ok(vec![]);
    };
    let codes: Vec<String> = csv
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if codes.is_empty() {
        return Ok(vec![]);
    }

    let found = discount::find_by_codes(pool, &codes).await?;
    let by_code: HashMap<String, Discount> =
        found.into_iter().map(|d| (d.code.clone(), d)).collect();

    let mut qualifying: Vec<Discount> = Vec::new();
    for code in &codes {
        let normalized = shared::models::normalize_code(code);
        let Some(d) = by_code.get(&normalized) else {
            tracing::debug!(code = %normalized, "Checkout code unknown, skipped");
            continue;
        };
        if !d.is_active {
            continue;
        }
        if let Err(e) = check_discount_gates(d, subtotal, now) {
            tracing::debug!(code = %d.code, reason = %e, "Checkout code no longer qualifies, skipped");
            continue;
        }
        // A code may legitimately appear once only
        if qualifying.iter().any(|q| q.id == d.id) {
            continue;
        }
        qualifying.push(d.clone());
    }

    if qualifying.len() > 1 {
        qualifying.retain(|d| {
            if d.is_stackable {
                true
            } else {
                tracing::debug!(code = %d.code, "Non-stackable code among several, skipped");
                false
            }
        });
    }

    let mut accepted = Vec::with_capacity(qualifying.len());
    for d in qualifying {
        let eligible_ids = if d.scope == shared::models::DiscountScope::Product {
            discount::find_product_ids(pool, d.id).await?
        } else {
            vec![]
        };
        let amount = calculator::compute_amount(&d, priced, &eligible_ids);
        if amount <= 0.0 {
            continue;
        }
        accepted.push((d, amount));
    }

    Ok(accepted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_util::{DiscountFixture, seed_product, seed_user, seed_variant, test_pool};
    use shared::models::{CartLine, PaymentMethod};

    const NOW: i64 = 1_000_000;

    fn base_input(items: Vec<CartLine>) -> OrderCreate {
        OrderCreate {
            user_id: 1,
            items,
            address_id: None,
            note: None,
            discount_codes: None,
            payment_method: PaymentMethod::Cod,
        }
    }

    fn line(product_id: i64, quantity: i64) -> CartLine {
        CartLine {
            product_id,
            variant_id: None,
            quantity,
        }
    }

    async fn setup() -> (SqlitePool, Config) {
        let pool = test_pool().await;
        seed_user(&pool, 1, "buyer@example.com", 0).await;
        (pool, Config::with_overrides("./unused", 0))
    }

    async fn product_stock(pool: &SqlitePool, id: i64) -> i64 {
        product::find_by_id(pool, id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_cod_happy_path() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Desk", 80.0, 5).await;

        let detail = create_order(&pool, &config, base_input(vec![line(10, 2)]), NOW)
            .await
            .unwrap();

        assert_eq!(detail.order.subtotal, 160.0);
        assert_eq!(detail.order.shipping_cost, 0.0); // >= 100
        assert_eq!(detail.order.tax, 12.80);
        assert_eq!(detail.order.total, 172.80);
        assert_eq!(detail.order.payment_status, PaymentStatus::Pending);
        assert_eq!(detail.order.status, OrderStatus::Pending);
        assert_eq!(detail.order.payment_expiry, None);
        assert_eq!(detail.order.currency, "USD");
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].price, 80.0);

        // Stock decremented
        assert_eq!(product_stock(&pool, 10).await, 3);

        // Row persisted
        let stored = order::find_by_id(&pool, detail.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.total, 172.80);
    }

    #[tokio::test]
    async fn test_shipping_charged_below_threshold() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Mug", 12.5, 10).await;

        let detail = create_order(&pool, &config, base_input(vec![line(10, 2)]), NOW)
            .await
            .unwrap();
        assert_eq!(detail.order.subtotal, 25.0);
        assert_eq!(detail.order.shipping_cost, 10.0);
        assert_eq!(detail.order.tax, 2.0);
        assert_eq!(detail.order.total, 37.0);
    }

    #[tokio::test]
    async fn test_momo_gets_expiry_and_vnd() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Desk", 80.0, 5).await;

        let mut input = base_input(vec![line(10, 1)]);
        input.payment_method = PaymentMethod::Momo;
        let detail = create_order(&pool, &config, input, NOW).await.unwrap();

        assert_eq!(detail.order.currency, "VND");
        assert_eq!(detail.order.payment_expiry, Some(NOW + 30 * 60_000));
        assert_eq!(detail.order.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_insufficient_stock_fails_without_mutation() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Desk", 80.0, 1).await;
        seed_product(&pool, 20, "Chair", 40.0, 5).await;

        let err = create_order(
            &pool,
            &config,
            base_input(vec![line(20, 1), line(10, 2)]),
            NOW,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Insufficient stock for Desk"));
        assert!(err.to_string().contains("Available: 1"));

        // No partial mutation: both stocks untouched, no order rows
        assert_eq!(product_stock(&pool, 10).await, 1);
        assert_eq!(product_stock(&pool, 20).await, 5);
        assert!(order::find_all(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_product_fails_order() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Desk", 80.0, 5).await;
        sqlx::query("UPDATE product SET is_active = 0 WHERE id = 10")
            .execute(&pool)
            .await
            .unwrap();

        let err = create_order(&pool, &config, base_input(vec![line(10, 1)]), NOW)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no longer available"));
    }

    #[tokio::test]
    async fn test_variant_price_and_stock_used() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Shirt", 20.0, 0).await; // base stock empty
        seed_variant(&pool, 11, 10, "XL", 25.0, 3).await;

        let detail = create_order(
            &pool,
            &config,
            base_input(vec![CartLine {
                product_id: 10,
                variant_id: Some(11),
                quantity: 2,
            }]),
            NOW,
        )
        .await
        .unwrap();

        assert_eq!(detail.order.subtotal, 50.0);
        assert_eq!(detail.items[0].price, 25.0);

        let v = product::find_variant_by_id(&pool, 11).await.unwrap().unwrap();
        assert_eq!(v.stock, 1);
        // Base product stock untouched
        assert_eq!(product_stock(&pool, 10).await, 0);
    }

    #[tokio::test]
    async fn test_discount_recomputed_server_side() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Desk", 100.0, 5).await;
        DiscountFixture::new(1, "TEN").percentage(10.0).seed(&pool).await;

        // 200 subtotal, 10% off, free shipping, 8% tax on the
        // discounted base.
        let mut input = base_input(vec![line(10, 2)]);
        input.discount_codes = Some("ten".into());
        let detail = create_order(&pool, &config, input, NOW).await.unwrap();

        assert_eq!(detail.order.subtotal, 200.0);
        assert_eq!(detail.order.discount_amount, 20.0);
        assert_eq!(detail.order.shipping_cost, 0.0);
        assert_eq!(detail.order.tax, 14.40);
        assert_eq!(detail.order.total, 194.40);
        assert_eq!(detail.order.discount_id, Some(1));
        assert_eq!(detail.order.discount_code.as_deref(), Some("TEN"));

        // Usage incremented inside the same transaction
        let d = discount::find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(d.used_count, 1);
    }

    #[tokio::test]
    async fn test_client_cannot_smuggle_discount_amounts() {
        // The storefront only sends codes, never amounts. A code that no
        // longer qualifies is simply dropped and the order totals carry
        // no discount — whatever number the client UI displayed.
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Desk", 50.0, 5).await;
        DiscountFixture::new(1, "BIG")
            .fixed(40.0)
            .min_order(500.0)
            .seed(&pool)
            .await;

        let mut input = base_input(vec![line(10, 1)]);
        input.discount_codes = Some("BIG".into());
        let detail = create_order(&pool, &config, input, NOW).await.unwrap();

        assert_eq!(detail.order.discount_amount, 0.0);
        assert_eq!(detail.order.discount_id, None);
        assert_eq!(detail.order.discount_code, None);
        let d = discount::find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(d.used_count, 0);
    }

    #[tokio::test]
    async fn test_multiple_codes_drop_non_stackables_individually() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Desk", 100.0, 5).await;
        DiscountFixture::new(1, "S10")
            .stackable()
            .percentage(10.0)
            .seed(&pool)
            .await;
        DiscountFixture::new(2, "S5")
            .stackable()
            .percentage(5.0)
            .seed(&pool)
            .await;
        DiscountFixture::new(3, "SOLO").fixed(50.0).seed(&pool).await;

        let mut input = base_input(vec![line(10, 2)]);
        input.discount_codes = Some("S10,SOLO,S5".into());
        let detail = create_order(&pool, &config, input, NOW).await.unwrap();

        // SOLO (non-stackable among several) is excluded, not fatal
        assert_eq!(detail.order.discount_code.as_deref(), Some("S10,S5"));
        assert_eq!(detail.order.discount_amount, 30.0); // 10% + 5% of 200

        let solo = discount::find_by_id(&pool, 3).await.unwrap().unwrap();
        assert_eq!(solo.used_count, 0);
    }

    #[tokio::test]
    async fn test_single_non_stackable_code_is_fine() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Desk", 100.0, 5).await;
        DiscountFixture::new(3, "SOLO").fixed(50.0).seed(&pool).await;

        let mut input = base_input(vec![line(10, 2)]);
        input.discount_codes = Some("SOLO".into());
        let detail = create_order(&pool, &config, input, NOW).await.unwrap();
        assert_eq!(detail.order.discount_amount, 50.0);
    }

    #[tokio::test]
    async fn test_discount_capped_at_subtotal() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Pen", 3.0, 5).await;
        DiscountFixture::new(1, "HUGE").fixed(50.0).seed(&pool).await;

        let mut input = base_input(vec![line(10, 1)]);
        input.discount_codes = Some("HUGE".into());
        let detail = create_order(&pool, &config, input, NOW).await.unwrap();

        assert_eq!(detail.order.subtotal, 3.0);
        assert_eq!(detail.order.discount_amount, 3.0);
        assert_eq!(detail.order.tax, 0.0);
        assert_eq!(detail.order.total, 10.0); // only shipping remains
    }

    #[tokio::test]
    async fn test_exhausted_discount_skipped_at_commit() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Desk", 100.0, 5).await;
        DiscountFixture::new(1, "GONE").max_uses(3, 3).seed(&pool).await;

        let mut input = base_input(vec![line(10, 1)]);
        input.discount_codes = Some("GONE".into());
        let detail = create_order(&pool, &config, input, NOW).await.unwrap();
        assert_eq!(detail.order.discount_amount, 0.0);

        let d = discount::find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(d.used_count, 3);
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let (pool, config) = setup().await;
        let err = create_order(&pool, &config, base_input(vec![]), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let (pool, config) = setup().await;
        seed_product(&pool, 10, "Desk", 80.0, 5).await;
        let mut input = base_input(vec![line(10, 1)]);
        input.user_id = 999;
        let err = create_order(&pool, &config, input, NOW).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
