use sqlx::{PgExecutor, PgPool};

use crate::models::Position;

/// Write the position for its (wallet, market) pair, replacing any previous state.
pub async fn upsert_position<'e>(db: impl PgExecutor<'e>, position: &Position) -> anyhow::Result<Position> {
    let row = sqlx::query_as::<_, Position>(
        r#"
        INSERT INTO positions (
            id, wallet_address, market_id, outcome, shares, avg_purchase_price,
            total_invested, current_value, unrealized_pnl, realized_pnl, status, opened_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (wallet_address, market_id) DO UPDATE SET
            outcome = EXCLUDED.outcome,
            shares = EXCLUDED.shares,
            avg_purchase_price = EXCLUDED.avg_purchase_price,
            total_invested = EXCLUDED.total_invested,
            current_value = EXCLUDED.current_value,
            unrealized_pnl = EXCLUDED.unrealized_pnl,
            realized_pnl = EXCLUDED.realized_pnl,
            status = EXCLUDED.status,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(position.id)
    .bind(&position.wallet_address)
    .bind(&position.market_id)
    .bind(&position.outcome)
    .bind(position.shares)
    .bind(position.avg_purchase_price)
    .bind(position.total_invested)
    .bind(position.current_value)
    .bind(position.unrealized_pnl)
    .bind(position.realized_pnl)
    .bind(&position.status)
    .bind(position.opened_at)
    .fetch_one(db)
    .await?;

    Ok(row)
}

pub async fn get_position(
    pool: &PgPool,
    wallet: &str,
    market_id: &str,
) -> anyhow::Result<Option<Position>> {
    let position = sqlx::query_as::<_, Position>(
        "SELECT * FROM positions WHERE wallet_address = $1 AND market_id = $2",
    )
    .bind(wallet)
    .bind(market_id)
    .fetch_optional(pool)
    .await?;

    Ok(position)
}

/// All positions of a wallet, open ones first.
pub async fn get_wallet_positions(
    pool: &PgPool,
    wallet: &str,
    open_only: bool,
) -> anyhow::Result<Vec<Position>> {
    let positions = sqlx::query_as::<_, Position>(
        r#"
        SELECT * FROM positions
        WHERE wallet_address = $1 AND ($2 = FALSE OR status = 'open')
        ORDER BY status DESC, opened_at DESC
        "#,
    )
    .bind(wallet)
    .bind(open_only)
    .fetch_all(pool)
    .await?;

    Ok(positions)
}
