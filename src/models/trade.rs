use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::TradeEvent;

/// Database row for trades table. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: Uuid,
    pub tx_hash: String,
    pub wallet_address: String,
    pub market_id: String,
    pub trade_type: String,
    pub outcome: Option<String>,
    pub token_amount: Decimal,
    pub shares: Decimal,
    pub price: Decimal,
    pub traded_at: DateTime<Utc>,
    pub processing_status: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Trade {
    pub fn from_event(event: &TradeEvent, status: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx_hash: event.tx_hash.clone(),
            wallet_address: event.wallet.clone(),
            market_id: event.market_id.clone(),
            trade_type: event.trade_type.as_str().to_string(),
            outcome: event.outcome.clone(),
            token_amount: event.token_amount,
            shares: event.shares,
            price: event.price,
            traded_at: event.timestamp,
            processing_status: status.to_string(),
            created_at: None,
        }
    }
}

/// Trade processing status constants.
pub mod processing_status {
    /// Applied to position, wallet and scoring.
    pub const PROCESSED: &str = "processed";
    /// Stored for the record but skipped for position purposes.
    pub const QUARANTINED: &str = "quarantined";
}
