pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod polymarket;
pub mod services;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Repository;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub repo: Arc<dyn Repository>,
    pub config: AppConfig,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
