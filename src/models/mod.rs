pub mod alert;
pub mod market;
pub mod position;
pub mod trade;
pub mod wallet;

pub use alert::{Alert, AlertStatus, RiskFactors};
pub use market::{Market, MarketMetadata};
pub use position::{Position, PositionStatus};
pub use trade::{processing_status, Trade};
pub use wallet::Wallet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ---------------------------------------------------------------------------
// TradeType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl TradeType {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUY" | "0" => Some(TradeType::Buy),
            "SELL" | "1" => Some(TradeType::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "buy",
            TradeType::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TradeEvent: core pipeline message
// ---------------------------------------------------------------------------

/// A trade as delivered by the market data source, before it is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub tx_hash: String,
    pub wallet: String,
    pub market_id: String,
    pub trade_type: TradeType,
    /// Outcome label bought or sold, e.g. "Yes".
    pub outcome: Option<String>,
    /// USDC notional of the trade.
    pub token_amount: Decimal,
    pub shares: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
    /// Market title embedded in the trade feed, used when no metadata is available.
    pub market_title: Option<String>,
}

impl TradeEvent {
    pub fn cursor(&self) -> Watermark {
        Watermark {
            timestamp: self.timestamp,
            tx_hash: self.tx_hash.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Watermark: ingestion cursor
// ---------------------------------------------------------------------------

/// Last successfully processed trade, ordered by timestamp then tx hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    pub timestamp: DateTime<Utc>,
    pub tx_hash: String,
}

impl Watermark {
    /// True if `event` sorts strictly after this cursor.
    pub fn precedes(&self, event: &TradeEvent) -> bool {
        (event.timestamp, event.tx_hash.as_str()) > (self.timestamp, self.tx_hash.as_str())
    }
}

impl Ord for Watermark {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.timestamp, &self.tx_hash).cmp(&(other.timestamp, &other.tx_hash))
    }
}

impl PartialOrd for Watermark {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort trades into stable processing order.
pub fn sort_for_processing(trades: &mut [TradeEvent]) {
    trades.sort_by(|a, b| {
        (a.timestamp, a.tx_hash.as_str()).cmp(&(b.timestamp, b.tx_hash.as_str()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(tx: &str, secs: i64) -> TradeEvent {
        TradeEvent {
            tx_hash: tx.into(),
            wallet: "0xabc".into(),
            market_id: "m".into(),
            trade_type: TradeType::Buy,
            outcome: Some("Yes".into()),
            token_amount: Decimal::ONE,
            shares: Decimal::ONE,
            price: Decimal::ONE,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            market_title: None,
        }
    }

    #[test]
    fn test_watermark_tie_breaks_on_tx_hash() {
        let mark = event("0x02", 100).cursor();
        assert!(!mark.precedes(&event("0x01", 100)));
        assert!(!mark.precedes(&event("0x02", 100)));
        assert!(mark.precedes(&event("0x03", 100)));
        assert!(mark.precedes(&event("0x00", 101)));
    }

    #[test]
    fn test_sort_for_processing() {
        let mut trades = vec![event("0xb", 5), event("0xa", 5), event("0xz", 1)];
        sort_for_processing(&mut trades);
        let order: Vec<&str> = trades.iter().map(|t| t.tx_hash.as_str()).collect();
        assert_eq!(order, vec!["0xz", "0xa", "0xb"]);
    }

    #[test]
    fn test_trade_type_from_api() {
        assert_eq!(TradeType::from_api_str("BUY"), Some(TradeType::Buy));
        assert_eq!(TradeType::from_api_str("sell"), Some(TradeType::Sell));
        assert_eq!(TradeType::from_api_str("hold"), None);
    }
}
