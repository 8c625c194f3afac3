use sqlx::{PgExecutor, PgPool};

use crate::models::Wallet;

/// Insert or replace the derived state of a wallet. `first_seen_date` only
/// ever moves earlier.
pub async fn upsert_wallet<'e>(db: impl PgExecutor<'e>, wallet: &Wallet) -> anyhow::Result<Wallet> {
    let row = sqlx::query_as::<_, Wallet>(
        r#"
        INSERT INTO wallets (
            address, first_seen_date, last_activity_date, total_trades,
            total_volume, lifetime_pnl, largest_position, is_fresh
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (address) DO UPDATE SET
            first_seen_date = LEAST(wallets.first_seen_date, EXCLUDED.first_seen_date),
            last_activity_date = EXCLUDED.last_activity_date,
            total_trades = EXCLUDED.total_trades,
            total_volume = EXCLUDED.total_volume,
            lifetime_pnl = EXCLUDED.lifetime_pnl,
            largest_position = EXCLUDED.largest_position,
            is_fresh = EXCLUDED.is_fresh,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&wallet.address)
    .bind(wallet.first_seen_date)
    .bind(wallet.last_activity_date)
    .bind(wallet.total_trades)
    .bind(wallet.total_volume)
    .bind(wallet.lifetime_pnl)
    .bind(wallet.largest_position)
    .bind(wallet.is_fresh)
    .fetch_one(db)
    .await?;

    Ok(row)
}

pub async fn get_wallet(pool: &PgPool, address: &str) -> anyhow::Result<Option<Wallet>> {
    let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE address = $1")
        .bind(address)
        .fetch_optional(pool)
        .await?;

    Ok(wallet)
}

/// List wallets by most recent activity, optionally only fresh ones.
pub async fn list_wallets(
    pool: &PgPool,
    fresh_only: bool,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Wallet>> {
    let wallets = sqlx::query_as::<_, Wallet>(
        r#"
        SELECT * FROM wallets
        WHERE ($1 = FALSE OR is_fresh = TRUE)
        ORDER BY last_activity_date DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(fresh_only)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(wallets)
}

/// (total wallets, fresh wallets)
pub async fn count_wallets(pool: &PgPool) -> anyhow::Result<(i64, i64)> {
    let row: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_fresh) FROM wallets",
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}
