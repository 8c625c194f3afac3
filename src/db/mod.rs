pub mod alert_repo;
pub mod config_repo;
pub mod cursor_repo;
pub mod market_repo;
pub mod position_repo;
pub mod trade_repo;
pub mod wallet_repo;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use crate::intelligence::Settlement;
use crate::models::{Alert, AlertStatus, Market, Position, Trade, Wallet, Watermark};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Everything one trade writes. Stored atomically by [`Repository::commit_trade`].
#[derive(Debug, Clone)]
pub struct TradeCommit {
    pub trade: Trade,
    pub wallet: Wallet,
    /// `None` when the trade was quarantined and the position left untouched.
    pub position: Option<Position>,
    pub alert: Option<Alert>,
    pub watermark: Watermark,
}

#[derive(Debug, Clone)]
pub enum CommitResult {
    Committed { trade: Trade, alert: Option<Alert> },
    /// The tx hash was already stored; nothing was written.
    Duplicate,
}

#[derive(Debug, Clone)]
pub enum DismissOutcome {
    Dismissed(Alert),
    NotFound,
    AlreadyTerminal(AlertStatus),
}

/// Storage used by the ingestion engine and the resolution sweep.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_wallet(&self, address: &str) -> anyhow::Result<Option<Wallet>>;

    async fn get_market(&self, market_id: &str) -> anyhow::Result<Option<Market>>;

    async fn save_market(&self, market: &Market) -> anyhow::Result<Market>;

    async fn get_position(&self, wallet: &str, market_id: &str) -> anyhow::Result<Option<Position>>;

    async fn open_positions(&self, wallet: &str) -> anyhow::Result<Vec<Position>>;

    async fn trade_exists(&self, tx_hash: &str) -> anyhow::Result<bool>;

    async fn count_trades_since(&self, wallet: &str, since: DateTime<Utc>) -> anyhow::Result<i64>;

    /// Store trade, wallet, position, alert and watermark as one unit.
    /// A tx hash that is already stored leaves everything unchanged.
    async fn commit_trade(&self, commit: TradeCommit) -> anyhow::Result<CommitResult>;

    async fn load_watermark(&self) -> anyhow::Result<Option<Watermark>>;

    async fn save_watermark(&self, mark: &Watermark) -> anyhow::Result<()>;

    async fn unresolved_markets_with_pending_alerts(&self) -> anyhow::Result<Vec<Market>>;

    async fn pending_alerts_for_resolved_markets(&self) -> anyhow::Result<Vec<Alert>>;

    /// Apply a settlement to a pending alert. `None` if it was no longer pending.
    async fn settle_alert(&self, alert_id: Uuid, settlement: &Settlement) -> anyhow::Result<Option<Alert>>;

    async fn dismiss_alert(&self, alert_id: Uuid) -> anyhow::Result<DismissOutcome>;

    async fn count_pending_alerts(&self) -> anyhow::Result<i64>;

    async fn load_runtime_config(&self) -> anyhow::Result<HashMap<String, String>>;
}

/// Postgres-backed [`Repository`].
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn get_wallet(&self, address: &str) -> anyhow::Result<Option<Wallet>> {
        wallet_repo::get_wallet(&self.pool, address).await
    }

    async fn get_market(&self, market_id: &str) -> anyhow::Result<Option<Market>> {
        market_repo::get_market(&self.pool, market_id).await
    }

    async fn save_market(&self, market: &Market) -> anyhow::Result<Market> {
        market_repo::upsert_market(&self.pool, market).await
    }

    async fn get_position(&self, wallet: &str, market_id: &str) -> anyhow::Result<Option<Position>> {
        position_repo::get_position(&self.pool, wallet, market_id).await
    }

    async fn open_positions(&self, wallet: &str) -> anyhow::Result<Vec<Position>> {
        position_repo::get_wallet_positions(&self.pool, wallet, true).await
    }

    async fn trade_exists(&self, tx_hash: &str) -> anyhow::Result<bool> {
        trade_repo::trade_exists(&self.pool, tx_hash).await
    }

    async fn count_trades_since(&self, wallet: &str, since: DateTime<Utc>) -> anyhow::Result<i64> {
        trade_repo::count_wallet_trades_since(&self.pool, wallet, since).await
    }

    async fn commit_trade(&self, commit: TradeCommit) -> anyhow::Result<CommitResult> {
        let mut tx = self.pool.begin().await?;

        // Wallet first: trades reference it.
        wallet_repo::upsert_wallet(&mut *tx, &commit.wallet).await?;

        let Some(trade) = trade_repo::insert_trade(&mut *tx, &commit.trade).await? else {
            tx.rollback().await?;
            return Ok(CommitResult::Duplicate);
        };

        if let Some(position) = &commit.position {
            position_repo::upsert_position(&mut *tx, position).await?;
        }

        let alert = match &commit.alert {
            Some(alert) => alert_repo::insert_alert(&mut *tx, alert).await?,
            None => None,
        };

        cursor_repo::save_watermark(&mut *tx, &commit.watermark).await?;

        tx.commit().await?;

        Ok(CommitResult::Committed { trade, alert })
    }

    async fn load_watermark(&self) -> anyhow::Result<Option<Watermark>> {
        cursor_repo::load_watermark(&self.pool).await
    }

    async fn save_watermark(&self, mark: &Watermark) -> anyhow::Result<()> {
        cursor_repo::save_watermark(&self.pool, mark).await
    }

    async fn unresolved_markets_with_pending_alerts(&self) -> anyhow::Result<Vec<Market>> {
        market_repo::get_unresolved_with_pending_alerts(&self.pool).await
    }

    async fn pending_alerts_for_resolved_markets(&self) -> anyhow::Result<Vec<Alert>> {
        alert_repo::get_pending_for_resolved_markets(&self.pool).await
    }

    async fn settle_alert(&self, alert_id: Uuid, settlement: &Settlement) -> anyhow::Result<Option<Alert>> {
        alert_repo::transition_pending(
            &self.pool,
            alert_id,
            settlement.status,
            Some(settlement.actual_return),
        )
        .await
    }

    async fn dismiss_alert(&self, alert_id: Uuid) -> anyhow::Result<DismissOutcome> {
        if let Some(alert) =
            alert_repo::transition_pending(&self.pool, alert_id, AlertStatus::Dismissed, None).await?
        {
            return Ok(DismissOutcome::Dismissed(alert));
        }

        Ok(match alert_repo::get_alert(&self.pool, alert_id).await? {
            Some(alert) => DismissOutcome::AlreadyTerminal(alert.lifecycle()),
            None => DismissOutcome::NotFound,
        })
    }

    async fn count_pending_alerts(&self) -> anyhow::Result<i64> {
        let counts = alert_repo::count_by_status(&self.pool).await?;
        Ok(counts
            .into_iter()
            .find(|(status, _)| status == AlertStatus::Pending.as_str())
            .map(|(_, n)| n)
            .unwrap_or(0))
    }

    async fn load_runtime_config(&self) -> anyhow::Result<HashMap<String, String>> {
        config_repo::load_overrides(&self.pool).await
    }
}
