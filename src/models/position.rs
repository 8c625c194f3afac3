use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for positions table. Unique per (wallet_address, market_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub id: Uuid,
    pub wallet_address: String,
    pub market_id: String,
    pub outcome: Option<String>,
    pub shares: Decimal,
    pub avg_purchase_price: Decimal,
    pub total_invested: Decimal,
    pub current_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub status: String,
    pub opened_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Position {
    pub fn empty(wallet: &str, market_id: &str, outcome: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_address: wallet.to_string(),
            market_id: market_id.to_string(),
            outcome,
            shares: Decimal::ZERO,
            avg_purchase_price: Decimal::ZERO,
            total_invested: Decimal::ZERO,
            current_value: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            status: PositionStatus::Closed.as_str().to_string(),
            opened_at: at,
            updated_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

impl PositionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionStatus::Open => "open",
            PositionStatus::Closed => "closed",
        }
    }

    pub fn for_shares(shares: Decimal) -> Self {
        if shares.is_zero() {
            PositionStatus::Closed
        } else {
            PositionStatus::Open
        }
    }
}
