use sqlx::{PgExecutor, PgPool};

use crate::models::Market;

/// Insert or update a market. Once resolved, only `outcome` and
/// `resolution_date` may change and `resolved` never flips back.
pub async fn upsert_market<'e>(db: impl PgExecutor<'e>, market: &Market) -> anyhow::Result<Market> {
    let row = sqlx::query_as::<_, Market>(
        r#"
        INSERT INTO markets (
            market_id, title, category, end_date, resolution_date,
            resolved, outcome, total_volume, holder_count
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (market_id) DO UPDATE SET
            title = CASE WHEN markets.resolved THEN markets.title ELSE EXCLUDED.title END,
            category = CASE WHEN markets.resolved THEN markets.category ELSE EXCLUDED.category END,
            end_date = CASE WHEN markets.resolved THEN markets.end_date ELSE EXCLUDED.end_date END,
            total_volume = CASE WHEN markets.resolved THEN markets.total_volume ELSE EXCLUDED.total_volume END,
            holder_count = CASE WHEN markets.resolved THEN markets.holder_count ELSE EXCLUDED.holder_count END,
            resolved = markets.resolved OR EXCLUDED.resolved,
            resolution_date = CASE WHEN markets.resolved
                THEN COALESCE(EXCLUDED.resolution_date, markets.resolution_date)
                ELSE EXCLUDED.resolution_date END,
            outcome = CASE WHEN markets.resolved
                THEN COALESCE(EXCLUDED.outcome, markets.outcome)
                ELSE EXCLUDED.outcome END,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&market.market_id)
    .bind(&market.title)
    .bind(&market.category)
    .bind(market.end_date)
    .bind(market.resolution_date)
    .bind(market.resolved)
    .bind(&market.outcome)
    .bind(market.total_volume)
    .bind(market.holder_count)
    .fetch_one(db)
    .await?;

    Ok(row)
}

pub async fn get_market(pool: &PgPool, market_id: &str) -> anyhow::Result<Option<Market>> {
    let market = sqlx::query_as::<_, Market>("SELECT * FROM markets WHERE market_id = $1")
        .bind(market_id)
        .fetch_optional(pool)
        .await?;

    Ok(market)
}

pub async fn list_markets(
    pool: &PgPool,
    resolved: Option<bool>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Market>> {
    let markets = sqlx::query_as::<_, Market>(
        r#"
        SELECT * FROM markets
        WHERE ($1::BOOLEAN IS NULL OR resolved = $1)
        ORDER BY updated_at DESC NULLS LAST
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(resolved)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(markets)
}

/// Open markets that still have pending alerts waiting on them.
pub async fn get_unresolved_with_pending_alerts(pool: &PgPool) -> anyhow::Result<Vec<Market>> {
    let markets = sqlx::query_as::<_, Market>(
        r#"
        SELECT m.* FROM markets m
        WHERE m.resolved = FALSE
          AND EXISTS (
              SELECT 1 FROM alerts a
              WHERE a.market_id = m.market_id AND a.status = 'pending'
          )
        ORDER BY m.end_date ASC NULLS LAST
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(markets)
}
