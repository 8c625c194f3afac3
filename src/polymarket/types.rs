use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{TradeEvent, TradeType};

// ---------------------------------------------------------------------------
// Trade (Data API, REST)
// ---------------------------------------------------------------------------

/// One row of the public trade feed (`GET /trades`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTrade {
    #[serde(default)]
    pub proxy_wallet: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub condition_id: Option<String>,
    /// Shares traded.
    #[serde(default)]
    pub size: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Unix seconds, sometimes milliseconds, sometimes a string.
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub event_slug: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

impl ApiTrade {
    /// Market id used throughout the system: the market slug, else the event slug.
    pub fn market_id(&self) -> Option<&str> {
        non_empty(self.slug.as_deref()).or(non_empty(self.event_slug.as_deref()))
    }

    /// Convert a feed row into a trade event. Rows without a tx hash, wallet,
    /// market, side or a positive size are dropped.
    pub fn to_event(&self) -> Option<TradeEvent> {
        let tx_hash = non_empty(self.transaction_hash.as_deref())?;
        let wallet = non_empty(self.proxy_wallet.as_deref())?;
        let market_id = self.market_id()?;
        let trade_type = TradeType::from_api_str(self.side.as_deref()?)?;

        let shares = self.size.filter(|s| *s > Decimal::ZERO)?;
        let price = self.price.unwrap_or(Decimal::ZERO);
        let timestamp = parse_trade_timestamp(self.timestamp.as_ref())?;

        Some(TradeEvent {
            tx_hash: tx_hash.to_lowercase(),
            wallet: wallet.to_lowercase(),
            market_id: market_id.to_string(),
            trade_type,
            outcome: non_empty(self.outcome.as_deref()).map(str::to_string),
            token_amount: shares * price,
            shares,
            price,
            timestamp,
            market_title: non_empty(self.title.as_deref()).map(str::to_string),
        })
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a feed timestamp: seconds or milliseconds, as a number or a string,
/// or an RFC 3339 string.
pub fn parse_trade_timestamp(ts: Option<&serde_json::Value>) -> Option<DateTime<Utc>> {
    ts.and_then(|t| match t {
        serde_json::Value::Number(n) => from_epoch(n.as_i64()?),
        serde_json::Value::String(s) => {
            if let Ok(secs) = s.parse::<i64>() {
                return from_epoch(secs);
            }
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        }
        _ => None,
    })
}

fn from_epoch(value: i64) -> Option<DateTime<Utc>> {
    // If >1e12, it's milliseconds
    if value > 1_000_000_000_000 {
        DateTime::from_timestamp(value / 1000, ((value % 1000) * 1_000_000) as u32)
    } else {
        DateTime::from_timestamp(value, 0)
    }
}
