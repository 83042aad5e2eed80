//! Order Model

use super::cart::CartLine;
use serde::{Deserialize, Serialize};

/// Order fulfillment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

/// Payment sub-state, parallel to the fulfillment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    Expired,
}

/// Payment method chosen at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentMethod {
    /// Cash on delivery, no provider session
    Cod,
    Stripe,
    Momo,
}

impl PaymentMethod {
    /// Settlement currency per method
    pub fn currency(&self) -> &'static str {
        match self {
            PaymentMethod::Momo => "VND",
            _ => "USD",
        }
    }

    /// Whether an external payment session (and expiry window) is required
    pub fn requires_payment_session(&self) -> bool {
        !matches!(self, PaymentMethod::Cod)
    }
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub address_id: Option<i64>,
    pub note: Option<String>,
    pub subtotal: f64,
    pub shipping_cost: f64,
    pub tax: f64,
    pub discount_amount: f64,
    pub total: f64,
    /// First applied discount (legacy single-discount column)
    pub discount_id: Option<i64>,
    /// Comma-joined list of every applied code
    pub discount_code: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub currency: String,
    /// Only set for non-COD methods: created_at + 30 minutes
    pub payment_expiry: Option<i64>,
    /// Provider transaction reference, recorded by the payment webhook
    pub transaction_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order line item, immutable after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    /// Name snapshot at time of purchase
    pub product_name: String,
    pub quantity: i64,
    /// Unit price at time of purchase, never recomputed
    pub price: f64,
}

/// Create order payload (checkout submission)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub user_id: i64,
    pub items: Vec<CartLine>,
    pub address_id: Option<i64>,
    pub note: Option<String>,
    /// Comma-joined discount codes; re-validated server-side
    pub discount_codes: Option<String>,
    pub payment_method: PaymentMethod,
}

/// Admin status transition payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Post-verification payment provider event
///
/// `result_code` 0 means success; anything else is a failure/expiry from
/// the provider. Signature verification happens upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub order_id: i64,
    pub result_code: i32,
    pub transaction_id: Option<String>,
}

/// Order with its items (detail responses)
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
