//! Order API module

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    // Customer checkout and history
    let customer_routes = Router::new()
        .route("/", post(handler::create))
        .route("/user/{user_id}", get(handler::list_by_user))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/cancel", post(handler::cancel));

    // Back-office fulfillment
    let manage_routes = Router::new()
        .route("/", get(handler::list))
        .route("/{id}/status", put(handler::update_status));

    customer_routes.merge(manage_routes)
}
