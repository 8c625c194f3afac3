//! HTTP surface against a live Postgres. Run with
//! `TEST_DATABASE_URL=... cargo test -- --ignored --test-threads=1`.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use metrics_exporter_prometheus::PrometheusBuilder;
use tower::ServiceExt;

use polywatch::api::router::create_router;
use polywatch::config::{AppConfig, DetectionConfig};
use polywatch::db::{wallet_repo, PgRepository, Repository};
use polywatch::ingestion::{process_trade, TradeOutcome};
use polywatch::models::Alert;
use polywatch::AppState;

use common::*;

fn test_config(database_url: String) -> AppConfig {
    AppConfig {
        database_url,
        host: "127.0.0.1".into(),
        port: 0,
        log_json: false,
        data_api_url: "http://localhost".into(),
        gamma_api_url: "http://localhost".into(),
        fetch_timeout_secs: 1,
        fetch_max_retries: 0,
        cycle_timeout_secs: 1,
        source_max_pages: 1,
        telegram_bot_token: None,
        telegram_chat_id: None,
        notifications_enabled: false,
        detection: DetectionConfig::default(),
    }
}

async fn build_test_app() -> (axum::Router, sqlx::PgPool) {
    let pool = common::setup_test_db().await;
    let repo: Arc<dyn Repository> = Arc::new(PgRepository::new(pool.clone()));

    // Not installed globally so every test can build its own
    let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

    let state = AppState {
        db: pool.clone(),
        repo,
        config: test_config(std::env::var("TEST_DATABASE_URL").unwrap_or_default()),
        metrics_handle,
    };

    (create_router(state), pool)
}

async fn send(app: &axum::Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Push the insider scenario through the pipeline and return its alert.
async fn seed_alert(pool: &sqlx::PgPool) -> Alert {
    let repo = PgRepository::new(pool.clone());
    let meta = niche_market(Duration::hours(6));
    wallet_repo::upsert_wallet(pool, &wallet_seen(INSIDER, 2)).await.unwrap();

    let event = buy("0xapi01", INSIDER, NICHE_MARKET, 9_000, price(60), Utc::now() - Duration::minutes(1));
    match process_trade(&repo, &DetectionConfig::default(), &event, Some(&meta), Utc::now()).await {
        Ok(TradeOutcome::Alerted { alert, .. }) => alert,
        other => panic!("Expected an alert, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_health_check() {
    let (app, _pool) = build_test_app().await;

    let (status, json) = send(&app, "GET", "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["last_tx_hash"].is_null());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_alert_listing_and_filters() {
    let (app, pool) = build_test_app().await;
    let alert = seed_alert(&pool).await;

    let (status, json) = send(&app, "GET", "/api/alerts?status=pending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    let alerts = json["data"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["id"], alert.id.to_string());

    let (_, json) = send(&app, "GET", "/api/alerts?min_score=90").await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let (status, json) = send(&app, "GET", "/api/alerts?status=resolved").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_dismiss_alert_then_conflict() {
    let (app, pool) = build_test_app().await;
    let alert = seed_alert(&pool).await;
    let uri = format!("/api/alerts/{}/dismiss", alert.id);

    let (status, json) = send(&app, "POST", &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "dismissed");

    let (status, _) = send(&app, "POST", &uri).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "POST", &format!("/api/alerts/{}/dismiss", uuid::Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_wallet_detail_and_trades() {
    let (app, pool) = build_test_app().await;
    seed_alert(&pool).await;

    let (status, json) = send(&app, "GET", &format!("/api/wallets/{INSIDER}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["wallet"]["address"], INSIDER);
    assert_eq!(json["data"]["stats"]["is_fresh"], true);
    assert_eq!(json["data"]["stats"]["total_trades"], 1);

    let (_, json) = send(&app, "GET", &format!("/api/wallets/{INSIDER}/trades")).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (_, json) = send(&app, "GET", &format!("/api/wallets/{INSIDER}/positions")).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "GET", "/api/wallets/0xnobody").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_market_and_trade_lookup() {
    let (app, pool) = build_test_app().await;
    seed_alert(&pool).await;

    let (status, json) = send(&app, "GET", &format!("/api/markets/{NICHE_MARKET}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["market_id"], NICHE_MARKET);

    let (status, json) = send(&app, "GET", "/api/trades/0xapi01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["wallet_address"], INSIDER);

    let (status, _) = send(&app, "GET", "/api/trades/0xmissing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_analytics_summary() {
    let (app, pool) = build_test_app().await;
    seed_alert(&pool).await;

    let (status, json) = send(&app, "GET", "/api/analytics/summary").await;

    assert_eq!(status, StatusCode::OK);
    let data = &json["data"];
    assert_eq!(data["total_wallets"], 1);
    assert_eq!(data["fresh_wallets"], 1);
    assert_eq!(data["total_trades"], 1);
    assert_eq!(data["alerts_by_status"]["pending"], 1);
    assert!(data["alert_hit_rate"].is_null());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_config_view_reflects_overrides() {
    let (app, pool) = build_test_app().await;

    let (_, json) = send(&app, "GET", "/api/config").await;
    assert_eq!(json["data"]["effective"]["suspicious_threshold"], 20);
    assert!(json["data"]["override_error"].is_null());

    sqlx::query("INSERT INTO runtime_config (key, value) VALUES ('SUSPICIOUS_THRESHOLD', '-1')")
        .execute(&pool)
        .await
        .unwrap();

    let (status, json) = send(&app, "GET", "/api/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["effective"]["suspicious_threshold"], 20);
    assert!(json["data"]["override_error"].is_string());
    assert_eq!(json["data"]["overrides"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_metrics_endpoint() {
    let (app, _pool) = build_test_app().await;

    let resp = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}
