use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::render));

    let api = Router::new()
        // Wallets
        .route("/api/wallets", get(handlers::wallets::list))
        .route("/api/wallets/:address", get(handlers::wallets::detail))
        .route("/api/wallets/:address/trades", get(handlers::wallets::trades))
        .route("/api/wallets/:address/positions", get(handlers::wallets::positions))
        // Markets
        .route("/api/markets", get(handlers::markets::list))
        .route("/api/markets/:id", get(handlers::markets::detail))
        .route("/api/markets/:id/trades", get(handlers::markets::trades))
        // Trades
        .route("/api/trades", get(handlers::trades::list))
        .route("/api/trades/:tx_hash", get(handlers::trades::detail))
        // Alerts
        .route("/api/alerts", get(handlers::alerts::list))
        .route("/api/alerts/:id", get(handlers::alerts::detail))
        .route("/api/alerts/:id/dismiss", post(handlers::alerts::dismiss))
        // Analytics
        .route("/api/analytics/summary", get(handlers::analytics::summary))
        .route("/api/config", get(handlers::config::get_config));

    // Read-only surface; any origin may read it.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
