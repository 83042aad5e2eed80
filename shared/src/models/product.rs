//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Base unit price, overridden by variant price on variant lines
    pub price: f64,
    /// Base stock, tracked per-variant when variants exist
    pub stock: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: Option<i64>,
}

/// Update product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}

/// Product variant entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub is_active: bool,
}

/// Create variant payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariantCreate {
    pub name: String,
    pub price: f64,
    pub stock: Option<i64>,
}

/// Update variant payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductVariantUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}

/// Product with its variants (detail responses)
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}
