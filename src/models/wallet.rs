use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for wallets table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub address: String,
    pub first_seen_date: DateTime<Utc>,
    pub last_activity_date: DateTime<Utc>,
    pub total_trades: i32,
    pub total_volume: Decimal,
    pub lifetime_pnl: Decimal,
    /// Largest cost basis any single position of this wallet has reached.
    pub largest_position: Decimal,
    pub is_fresh: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Wallet {
    /// A wallet seen for the first time, before its first trade is applied.
    pub fn first_seen(address: &str, at: DateTime<Utc>) -> Self {
        Self {
            address: address.to_string(),
            first_seen_date: at,
            last_activity_date: at,
            total_trades: 0,
            total_volume: Decimal::ZERO,
            lifetime_pnl: Decimal::ZERO,
            largest_position: Decimal::ZERO,
            is_fresh: true,
            created_at: None,
            updated_at: None,
        }
    }

    /// Mean notional per trade, or zero for a wallet with no trades.
    pub fn average_trade_size(&self) -> Decimal {
        if self.total_trades <= 0 {
            return Decimal::ZERO;
        }
        self.total_volume / Decimal::from(self.total_trades)
    }
}
