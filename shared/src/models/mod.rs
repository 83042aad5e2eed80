//! Data models
//!
//! Shared between store-server and the storefront frontend (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod cart;
pub mod discount;
pub mod order;
pub mod product;
pub mod user;

// Re-exports
pub use cart::*;
pub use discount::*;
pub use order::*;
pub use product::*;
pub use user::*;
