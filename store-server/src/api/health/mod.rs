//! Health check endpoint

use axum::{Json, Router, extract::State, routing::get};

use crate::core::ServerState;
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

/// GET /health - liveness plus a database ping
async fn health(State(state): State<ServerState>) -> AppResult<Json<serde_json::Value>> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(|e| crate::utils::AppError::database(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "ok",
        "service": "store-server",
    })))
}
