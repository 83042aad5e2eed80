//! Discount API module

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/discounts", routes())
}

fn routes() -> Router<ServerState> {
    // Checkout-facing evaluation endpoints
    let checkout_routes = Router::new()
        .route("/apply", post(handler::apply))
        .route("/auto", post(handler::auto_apply));

    // Back-office management
    let manage_routes = Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .put(handler::update)
                .delete(handler::delete),
        );

    checkout_routes.merge(manage_routes)
}
