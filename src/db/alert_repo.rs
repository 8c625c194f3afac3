use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::{Alert, AlertStatus};

/// Insert an alert unless its triggering trade already has one.
pub async fn insert_alert<'e>(db: impl PgExecutor<'e>, alert: &Alert) -> anyhow::Result<Option<Alert>> {
    let row = sqlx::query_as::<_, Alert>(
        r#"
        INSERT INTO alerts (
            id, wallet_address, market_id, trade_id, tx_hash, risk_score, risk_factors,
            position_size, potential_payout, market_resolution_date, status, flagged_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (tx_hash) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(alert.id)
    .bind(&alert.wallet_address)
    .bind(&alert.market_id)
    .bind(alert.trade_id)
    .bind(&alert.tx_hash)
    .bind(alert.risk_score)
    .bind(&alert.risk_factors)
    .bind(alert.position_size)
    .bind(alert.potential_payout)
    .bind(alert.market_resolution_date)
    .bind(&alert.status)
    .bind(alert.flagged_at)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn get_alert(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<Alert>> {
    let alert = sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(alert)
}

/// Newest alerts first, filtered by status and/or minimum score.
pub async fn list_alerts(
    pool: &PgPool,
    status: Option<AlertStatus>,
    min_score: Option<i32>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Alert>> {
    let alerts = sqlx::query_as::<_, Alert>(
        r#"
        SELECT * FROM alerts
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::INTEGER IS NULL OR risk_score >= $2)
        ORDER BY flagged_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(status.map(|s| s.as_str()))
    .bind(min_score)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(alerts)
}

/// Pending alerts whose market has resolved.
pub async fn get_pending_for_resolved_markets(pool: &PgPool) -> anyhow::Result<Vec<Alert>> {
    let alerts = sqlx::query_as::<_, Alert>(
        r#"
        SELECT a.* FROM alerts a
        JOIN markets m ON m.market_id = a.market_id
        WHERE a.status = 'pending' AND m.resolved = TRUE
        ORDER BY a.flagged_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(alerts)
}

/// Move a pending alert to a terminal status. Returns `None` if the alert is
/// missing or no longer pending, so a terminal status is never overwritten.
pub async fn transition_pending<'e>(
    db: impl PgExecutor<'e>,
    id: Uuid,
    status: AlertStatus,
    actual_return: Option<Decimal>,
) -> anyhow::Result<Option<Alert>> {
    let alert = sqlx::query_as::<_, Alert>(
        r#"
        UPDATE alerts
        SET status = $2, actual_return = $3, settled_at = $4
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status.as_str())
    .bind(actual_return)
    .bind(Utc::now())
    .fetch_optional(db)
    .await?;

    Ok(alert)
}

/// Alert count per status.
pub async fn count_by_status(pool: &PgPool) -> anyhow::Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM alerts GROUP BY status ORDER BY status",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sum of actual returns over settled alerts, split into (won, lost).
pub async fn settled_returns(pool: &PgPool) -> anyhow::Result<(Decimal, Decimal)> {
    let row: (Decimal, Decimal) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(actual_return) FILTER (WHERE status = 'won'), 0),
            COALESCE(SUM(actual_return) FILTER (WHERE status = 'lost'), 0)
        FROM alerts
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}
