//! API route modules
//!
//! One module per resource: `mod.rs` wires the router, `handler.rs` holds
//! the handlers. Admin routes are grouped separately inside each router.
//!
//! - [`health`] - liveness check
//! - [`products`] - catalog browsing and admin CRUD
//! - [`discounts`] - admin CRUD plus checkout-facing apply/auto endpoints
//! - [`orders`] - checkout, history, cancellation, admin status
//! - [`payments`] - payment provider webhook
//! - [`users`] - minimal account records

pub mod discounts;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::core::ServerState;

/// Assemble the full application router
pub fn app(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(products::router())
        .merge(discounts::router())
        .merge(orders::router())
        .merge(payments::router())
        .merge(users::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
