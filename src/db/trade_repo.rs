use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};

use crate::models::Trade;

/// Insert a trade unless its tx hash is already stored. Returns `None` for duplicates.
pub async fn insert_trade<'e>(db: impl PgExecutor<'e>, trade: &Trade) -> anyhow::Result<Option<Trade>> {
    let row = sqlx::query_as::<_, Trade>(
        r#"
        INSERT INTO trades (
            id, tx_hash, wallet_address, market_id, trade_type, outcome,
            token_amount, shares, price, traded_at, processing_status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (tx_hash) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(trade.id)
    .bind(&trade.tx_hash)
    .bind(&trade.wallet_address)
    .bind(&trade.market_id)
    .bind(&trade.trade_type)
    .bind(&trade.outcome)
    .bind(trade.token_amount)
    .bind(trade.shares)
    .bind(trade.price)
    .bind(trade.traded_at)
    .bind(&trade.processing_status)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn trade_exists(pool: &PgPool, tx_hash: &str) -> anyhow::Result<bool> {
    let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM trades WHERE tx_hash = $1)")
        .bind(tx_hash)
        .fetch_one(pool)
        .await?;

    Ok(row.0)
}

pub async fn get_trade_by_hash(pool: &PgPool, tx_hash: &str) -> anyhow::Result<Option<Trade>> {
    let trade = sqlx::query_as::<_, Trade>("SELECT * FROM trades WHERE tx_hash = $1")
        .bind(tx_hash)
        .fetch_optional(pool)
        .await?;

    Ok(trade)
}

/// Count a wallet's stored trades at or after `since`.
pub async fn count_wallet_trades_since(
    pool: &PgPool,
    wallet: &str,
    since: DateTime<Utc>,
) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM trades WHERE wallet_address = $1 AND traded_at >= $2",
    )
    .bind(wallet)
    .bind(since)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Most recent trades, optionally narrowed to one wallet and/or one market.
pub async fn list_trades(
    pool: &PgPool,
    wallet: Option<&str>,
    market_id: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Trade>> {
    let trades = sqlx::query_as::<_, Trade>(
        r#"
        SELECT * FROM trades
        WHERE ($1::TEXT IS NULL OR wallet_address = $1)
          AND ($2::TEXT IS NULL OR market_id = $2)
        ORDER BY traded_at DESC, tx_hash DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(wallet)
    .bind(market_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(trades)
}

/// (trade count, total notional)
pub async fn trade_totals(pool: &PgPool) -> anyhow::Result<(i64, Decimal)> {
    let row: (i64, Decimal) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(token_amount), 0) FROM trades",
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}
