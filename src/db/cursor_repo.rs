use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use crate::models::Watermark;

pub async fn load_watermark(pool: &PgPool) -> anyhow::Result<Option<Watermark>> {
    let row: Option<(DateTime<Utc>, String)> = sqlx::query_as(
        "SELECT last_timestamp, last_tx_hash FROM ingestion_cursor WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(timestamp, tx_hash)| Watermark { timestamp, tx_hash }))
}

/// Advance the cursor. A watermark older than the stored one is ignored.
pub async fn save_watermark<'e>(db: impl PgExecutor<'e>, mark: &Watermark) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO ingestion_cursor (id, last_timestamp, last_tx_hash, updated_at)
        VALUES (1, $1, $2, NOW())
        ON CONFLICT (id) DO UPDATE SET
            last_timestamp = EXCLUDED.last_timestamp,
            last_tx_hash = EXCLUDED.last_tx_hash,
            updated_at = NOW()
        WHERE (ingestion_cursor.last_timestamp, ingestion_cursor.last_tx_hash)
            < (EXCLUDED.last_timestamp, EXCLUDED.last_tx_hash)
        "#,
    )
    .bind(mark.timestamp)
    .bind(&mark.tx_hash)
    .execute(db)
    .await?;

    Ok(())
}
