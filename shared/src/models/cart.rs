//! Cart Line Model
//!
//! Ephemeral checkout input. Prices and stock are never taken from the
//! client; the catalog is re-read at evaluation time and again at commit.

use serde::{Deserialize, Serialize};

/// A single cart line as submitted by the storefront
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
}
