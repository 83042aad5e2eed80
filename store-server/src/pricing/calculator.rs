//! Discount Calculator
//!
//! Pure money math on resolved cart lines. Uses rust_decimal internally,
//! stores and transports f64 rounded to 2 decimal places.

use rust_decimal::prelude::*;
use shared::models::{Discount, DiscountScope, DiscountType};

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// A cart line with its price already resolved from the catalog.
/// Lines whose product was missing or inactive never make it here.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    /// Variant price when a variant is referenced, else the base price
    pub unit_price: f64,
    pub quantity: i64,
}

impl PricedLine {
    fn line_total(&self) -> Decimal {
        to_decimal(self.unit_price) * Decimal::from(self.quantity)
    }
}

fn subtotal_decimal(lines: &[PricedLine]) -> Decimal {
    lines.iter().fold(Decimal::ZERO, |acc, l| acc + l.line_total())
}

/// Cart subtotal: sum of unit price x quantity over the resolved lines.
pub fn cart_subtotal(lines: &[PricedLine]) -> f64 {
    to_f64(subtotal_decimal(lines))
}

/// Compute the monetary contribution of a discount against a cart.
///
/// ORDER scope works on the whole subtotal; PRODUCT scope on the subtotal
/// of lines whose product is in `eligible_ids`. The result is rounded to
/// 2dp, never negative and never above the base it was computed against.
/// A result of 0 means "not applicable" — callers filter those out rather
/// than record a zero-value application.
pub fn compute_amount(discount: &Discount, lines: &[PricedLine], eligible_ids: &[i64]) -> f64 {
    let base = match discount.scope {
        DiscountScope::Order => subtotal_decimal(lines),
        DiscountScope::Product => {
            let eligible: Vec<PricedLine> = lines
                .iter()
                .filter(|l| eligible_ids.contains(&l.product_id))
                .cloned()
                .collect();
            subtotal_decimal(&eligible)
        }
    };

    if base <= Decimal::ZERO {
        return 0.0;
    }

    let amount = match discount.discount_type {
        DiscountType::Percentage => base * to_decimal(discount.value) / Decimal::ONE_HUNDRED,
        DiscountType::Fixed => to_decimal(discount.value).min(base),
    };

    // Clamp into [0, base]; a misconfigured value must not oversubtract
    to_f64(amount.clamp(Decimal::ZERO, base))
}

/// Sum already-rounded discount amounts.
pub fn sum_amounts(amounts: &[f64]) -> f64 {
    to_f64(amounts.iter().fold(Decimal::ZERO, |acc, a| acc + to_decimal(*a)))
}

/// Sum already-rounded discount amounts, capped at the subtotal.
pub fn total_discount(amounts: &[f64], subtotal: f64) -> f64 {
    let sum = amounts.iter().fold(Decimal::ZERO, |acc, a| acc + to_decimal(*a));
    to_f64(sum.min(to_decimal(subtotal)))
}

/// Shipping is free from 100 upward, otherwise a flat 10. Business policy.
pub fn shipping_cost(subtotal: f64) -> f64 {
    if subtotal >= 100.0 { 0.0 } else { 10.0 }
}

/// 8% tax on the discounted subtotal. Business policy.
pub fn tax_amount(subtotal: f64, discount_amount: f64) -> f64 {
    let taxable = (to_decimal(subtotal) - to_decimal(discount_amount)).max(Decimal::ZERO);
    to_f64(taxable * to_decimal(0.08))
}

/// Order total: subtotal - discount + shipping + tax.
pub fn order_total(subtotal: f64, discount_amount: f64, shipping: f64, tax: f64) -> f64 {
    to_f64(
        to_decimal(subtotal) - to_decimal(discount_amount) + to_decimal(shipping)
            + to_decimal(tax),
    )
}
