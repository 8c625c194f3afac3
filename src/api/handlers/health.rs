use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

/// Liveness plus database reachability and the ingestion watermark.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    if !db_ok {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "db": "disconnected" })),
        );
    }

    let watermark = state.repo.load_watermark().await.ok().flatten();

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "db": "connected",
            "last_trade_at": watermark.as_ref().map(|w| w.timestamp),
            "last_tx_hash": watermark.as_ref().map(|w| w.tx_hash.as_str()),
        })),
    )
}
