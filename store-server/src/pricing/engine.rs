//! Discount Engine
//!
//! Resolves cart lines against the live catalog and runs the discount gate
//! sequence: manual code application and automatic discount surfacing.
//! All reads, no side effects — safe to call repeatedly for the same cart.
//! The checkout UI's view of the discount is advisory; the order committer
//! re-runs this engine before anything is persisted.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::db::repository::{discount, product, user};
use crate::pricing::calculator::{self, PricedLine};
use crate::utils::{AppError, AppResult};
use shared::models::{
    AppliedDiscount, CartLine, CodeApplication, Discount, DiscountMethod, DiscountScope,
};

/// Discount Engine - evaluates discounts against a cart snapshot
#[derive(Clone)]
pub struct DiscountEngine {
    pool: SqlitePool,
}

impl DiscountEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve cart lines against the catalog.
    ///
    /// Lines whose product is missing or inactive are silently dropped —
    /// they contribute nothing to the subtotal. A referenced variant must
    /// exist and belong to the line's product, otherwise the line is
    /// dropped the same way. Variant price overrides the base price.
    pub async fn resolve_lines(&self, cart: &[CartLine]) -> AppResult<Vec<PricedLine>> {
        let product_ids: Vec<i64> = cart.iter().map(|l| l.product_id).collect();
        let variant_ids: Vec<i64> = cart.iter().filter_map(|l| l.variant_id).collect();

        let products: HashMap<i64, _> = product::find_by_ids(&self.pool, &product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let variants: HashMap<i64, _> = product::find_variants_by_ids(&self.pool, &variant_ids)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        let mut lines = Vec::with_capacity(cart.len());
        for cart_line in cart {
            let Some(p) = products.get(&cart_line.product_id) else {
                tracing::warn!(
                    product_id = cart_line.product_id,
                    "Cart references unknown product, line dropped"
                );
                continue;
            };
            if !p.is_active {
                continue;
            }

            let unit_price = match cart_line.variant_id {
                Some(vid) => match variants.get(&vid) {
                    Some(v) if v.product_id == p.id => v.price,
                    _ => {
                        tracing::warn!(
                            product_id = p.id,
                            variant_id = vid,
                            "Cart references unknown variant, line dropped"
                        );
                        continue;
                    }
                },
                None => p.price,
            };

            lines.push(PricedLine {
                product_id: cart_line.product_id,
                variant_id: cart_line.variant_id,
                unit_price,
                quantity: cart_line.quantity,
            });
        }

        Ok(lines)
    }

    /// Manual code application.
    ///
    /// Gate order: lookup/active, claim method, duplicate, stacking,
    /// window, usage, minimum. The first failing gate rejects with its
    /// message; a passing run returns the computed application and whether
    /// it must replace everything applied so far.
    pub async fn apply_code(
        &self,
        code: &str,
        cart: &[CartLine],
        existing_ids: &[i64],
        user_id: i64,
        now: i64,
    ) -> AppResult<CodeApplication> {
        let lines = self.resolve_lines(cart).await?;
        let subtotal = calculator::cart_subtotal(&lines);

        let Some(d) = discount::find_by_code(&self.pool, code).await? else {
            return Err(AppError::business(format!("No discount found for code {}", code.trim())));
        };
        if !d.is_active {
            return Err(AppError::business(format!("No discount found for code {}", d.code)));
        }

        // Claim method gate
        match d.method {
            DiscountMethod::Auto => {
                return Err(AppError::business(
                    "This discount is applied automatically and cannot be entered as a code",
                ));
            }
            DiscountMethod::Code => {
                let u = user::find_by_id(&self.pool, user_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;
                // Members-only: the account must predate the discount
                if u.created_at >= d.created_at {
                    return Err(AppError::business(
                        "This discount is reserved for existing members",
                    ));
                }
            }
        }

        if existing_ids.contains(&d.id) {
            return Err(AppError::business(format!(
                "Discount {} is already applied",
                d.code
            )));
        }

        // Stacking resolution against the already-applied set
        let mut replace_all = false;
        if !existing_ids.is_empty() {
            if !d.is_stackable {
                // Non-stackable newcomer evicts everything applied so far
                replace_all = true;
            } else {
                let existing = discount::find_by_ids(&self.pool, existing_ids).await?;
                if let Some(blocker) = existing.iter().find(|e| !e.is_stackable) {
                    return Err(AppError::business(format!(
                        "Cannot combine with non-stackable discount {}",
                        blocker.code
                    )));
                }
            }
        }

        self.check_window_usage_minimum(&d, subtotal, now)?;

        let eligible_ids = self.eligible_ids(&d).await?;
        let amount = calculator::compute_amount(&d, &lines, &eligible_ids);
        // Amount 0 (e.g. no eligible line in the cart) is allowed here;
        // the caller decides whether to surface it.

        Ok(CodeApplication {
            applied: AppliedDiscount::from_discount(&d, amount),
            replace_all,
        })
    }

    /// Automatic discount surfacing for a checkout session.
    ///
    /// Qualifying AUTO discounts are partitioned into stackables and the
    /// single best non-stackable; the set with the larger customer benefit
    /// wins (stackables on a tie).
    pub async fn auto_apply(&self, cart: &[CartLine], now: i64) -> AppResult<Vec<AppliedDiscount>> {
        let lines = self.resolve_lines(cart).await?;
        let subtotal = calculator::cart_subtotal(&lines);

        let candidates = discount::find_active_auto(&self.pool, now).await?;

        let mut stackable: Vec<AppliedDiscount> = Vec::new();
        let mut best_non_stackable: Option<AppliedDiscount> = None;

        for d in &candidates {
            if self.check_window_usage_minimum(d, subtotal, now).is_err() {
                continue;
            }
            let eligible_ids = self.eligible_ids(d).await?;
            let amount = calculator::compute_amount(d, &lines, &eligible_ids);
            if amount <= 0.0 {
                continue;
            }

            let applied = AppliedDiscount::from_discount(d, amount);
            if d.is_stackable {
                stackable.push(applied);
            } else {
                // Ties keep the first seen
                let better = best_non_stackable
                    .as_ref()
                    .is_none_or(|best| applied.amount > best.amount);
                if better {
                    best_non_stackable = Some(applied);
                }
            }
        }

        let stackable_total =
            calculator::sum_amounts(&stackable.iter().map(|a| a.amount).collect::<Vec<_>>());

        match best_non_stackable {
            Some(best) if stackable.is_empty() || best.amount > stackable_total => Ok(vec![best]),
            _ => Ok(stackable),
        }
    }

    fn check_window_usage_minimum(&self, d: &Discount, subtotal: f64, now: i64) -> AppResult<()> {
        check_discount_gates(d, subtotal, now)
    }

    async fn eligible_ids(&self, d: &Discount) -> AppResult<Vec<i64>> {
        if d.scope == DiscountScope::Product {
            Ok(discount::find_product_ids(&self.pool, d.id).await?)
        } else {
            Ok(vec![])
        }
    }
}

/// Shared gate sequence: activation window, usage limit, order minimum.
/// Order matters — the first failing gate is the one reported. Used for
/// manual application, auto surfacing, and again by the order committer
/// before anything is persisted.
pub fn check_discount_gates(d: &Discount, subtotal: f64, now: i64) -> AppResult<()> {
    if let Some(starts_at) = d.starts_at
        && starts_at > now
    {
        return Err(AppError::business(format!(
            "Discount {} is not active yet",
            d.code
        )));
    }
    if let Some(expires_at) = d.expires_at
        && expires_at < now
    {
        return Err(AppError::business(format!("Discount {} has expired", d.code)));
    }
    if let Some(max_uses) = d.max_uses
        && d.used_count >= max_uses
    {
        return Err(AppError::business(format!(
            "Discount {} has reached its usage limit",
            d.code
        )));
    }
    if let Some(min_order) = d.min_order
        && subtotal < min_order
    {
        return Err(AppError::business(format!(
            "Minimum order of {min_order:.2} required for discount {}",
            d.code
        )));
    }
    Ok(())
}
