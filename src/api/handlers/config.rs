use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::ApiResponse;
use crate::config::DetectionConfig;
use crate::db::config_repo::{self, RuntimeConfigEntry};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigView {
    /// Startup configuration with the stored overrides applied.
    pub effective: DetectionConfig,
    pub overrides: Vec<RuntimeConfigEntry>,
    /// Set when the overrides do not validate; the collector keeps its previous settings.
    pub override_error: Option<String>,
}

/// Read-only view of the detection settings the next cycle will use.
pub async fn get_config(State(state): State<AppState>) -> Result<Json<ApiResponse<ConfigView>>, AppError> {
    let overrides = config_repo::get_all_config(&state.db).await?;
    let map: HashMap<String, String> = overrides
        .iter()
        .map(|e| (e.key.clone(), e.value.clone()))
        .collect();

    let base = &state.config.detection;
    let (effective, override_error) = match base.with_overrides(&map) {
        Ok(config) => (config, None),
        Err(e) => (base.clone(), Some(e.to_string())),
    };

    Ok(ApiResponse::ok(ConfigView {
        effective,
        overrides,
        override_error,
    }))
}
