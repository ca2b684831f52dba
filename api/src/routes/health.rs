use crate::AppState;
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::error;

/// GET /health
/// Response: 200 OK when the database answers, 503 otherwise
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let timestamp = Utc::now().timestamp();

    match state.posts.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
              "status": "healthy",
              "timestamp": timestamp
            })),
        ),
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                  "status": "unhealthy",
                  "timestamp": timestamp
                })),
            )
        }
    }
}
