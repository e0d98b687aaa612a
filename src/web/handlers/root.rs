// GET / and GET /health.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Welcome to the Global Environmental Intelligence Hub API"
    }))
}

/// Health check — always returns 200 OK.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}
