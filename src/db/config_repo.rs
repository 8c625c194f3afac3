use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RuntimeConfigEntry {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// All override entries, ordered by key.
pub async fn get_all_config(pool: &PgPool) -> anyhow::Result<Vec<RuntimeConfigEntry>> {
    let rows = sqlx::query_as::<_, RuntimeConfigEntry>(
        "SELECT key, value, updated_at FROM runtime_config ORDER BY key",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Runtime overrides as a key → value map, ready to overlay on the detection config.
pub async fn load_overrides(pool: &PgPool) -> anyhow::Result<HashMap<String, String>> {
    let rows = get_all_config(pool).await?;
    Ok(rows.into_iter().map(|e| (e.key, e.value)).collect())
}
