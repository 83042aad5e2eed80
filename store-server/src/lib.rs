//! Storefront Server
//!
//! Server-rendered e-commerce backend: product catalog, a stacking /
//! auto-apply discount engine, transactional checkout, and order lifecycle
//! management.
//!
//! # Module structure
//!
//! ```text
//! store-server/src/
//! ├── core/          # configuration, state, server, background tasks
//! ├── db/            # SQLite pool + repositories
//! ├── pricing/       # discount evaluation engine
//! ├── orders/        # checkout commit and lifecycle actions
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # errors, logging, validation
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod orders;
pub mod pricing;
pub mod utils;

// Re-export public types
pub use crate::core::{Config, Server, ServerState};
pub use crate::pricing::DiscountEngine;
pub use crate::utils::logger::init_logger;
pub use crate::utils::{AppError, AppResult};
