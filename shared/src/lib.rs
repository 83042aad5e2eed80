//! Shared types for the storefront server
//!
//! Domain models and utility types used by the server crate. Models carry an
//! optional `db` feature that enables sqlx derives so rows map straight out
//! of the store.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
