//! Discount Model

use serde::{Deserialize, Serialize};

/// Discount value type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DiscountType {
    Percentage,
    Fixed,
}

/// What the discount applies against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DiscountScope {
    /// Whole-cart subtotal
    Order,
    /// Subtotal restricted to the eligible product set
    Product,
}

/// How the discount is claimed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DiscountMethod {
    /// Surfaced automatically at checkout, never claimable by code entry
    Auto,
    /// Entered by the customer as a code
    Code,
}

/// Normalize a customer-entered code to storage form (trim + uppercase).
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Discount entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Discount {
    pub id: i64,
    /// Unique, stored upper-cased; lookups normalize trim + uppercase
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub scope: DiscountScope,
    pub method: DiscountMethod,
    pub is_stackable: bool,
    /// Percentage 0-100 or fixed currency amount
    pub value: f64,
    pub min_order: Option<f64>,
    pub max_uses: Option<i64>,
    /// Incremented exactly once per committed order that applies it
    pub used_count: i64,
    pub is_active: bool,
    pub starts_at: Option<i64>,
    pub expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create discount payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCreate {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub scope: DiscountScope,
    pub method: DiscountMethod,
    pub is_stackable: Option<bool>,
    pub value: f64,
    pub min_order: Option<f64>,
    pub max_uses: Option<i64>,
    pub starts_at: Option<i64>,
    pub expires_at: Option<i64>,
    /// Eligible products (required when scope = PRODUCT)
    pub product_ids: Option<Vec<i64>>,
}

/// Update discount payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountUpdate {
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub scope: Option<DiscountScope>,
    pub method: Option<DiscountMethod>,
    pub is_stackable: Option<bool>,
    pub value: Option<f64>,
    pub min_order: Option<f64>,
    pub max_uses: Option<i64>,
    pub is_active: Option<bool>,
    pub starts_at: Option<i64>,
    pub expires_at: Option<i64>,
    /// When present, replaces the eligibility set wholesale
    pub product_ids: Option<Vec<i64>>,
}

/// A discount applied to a cart, with its computed contribution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedDiscount {
    pub discount_id: i64,
    pub code: String,
    pub discount_type: DiscountType,
    pub scope: DiscountScope,
    pub method: DiscountMethod,
    pub is_stackable: bool,
    pub value: f64,
    /// Monetary contribution, rounded to 2dp, never above the subtotal
    /// it was computed against
    pub amount: f64,
    pub description: Option<String>,
}

impl AppliedDiscount {
    /// Create from a Discount with its computed amount
    pub fn from_discount(discount: &Discount, amount: f64) -> Self {
        Self {
            discount_id: discount.id,
            code: discount.code.clone(),
            discount_type: discount.discount_type,
            scope: discount.scope,
            method: discount.method,
            is_stackable: discount.is_stackable,
            value: discount.value,
            amount,
            description: discount.description.clone(),
        }
    }
}

/// Result of a manual code application
///
/// `replace_all` signals that the new discount is non-stackable and must
/// replace every previously applied discount on the caller's side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeApplication {
    pub applied: AppliedDiscount,
    pub replace_all: bool,
}

/// Discount with its eligible product set (admin detail responses)
#[derive(Debug, Clone, Serialize)]
pub struct DiscountDetail {
    #[serde(flatten)]
    pub discount: Discount,
    pub product_ids: Vec<i64>,
}
