use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database row for markets table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Market {
    pub market_id: String,
    pub title: String,
    pub category: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
    pub resolution_date: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub outcome: Option<String>,
    pub total_volume: Option<Decimal>,
    pub holder_count: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Market {
    /// Best known resolution time: the actual one once resolved, else the scheduled end.
    pub fn expected_resolution(&self) -> Option<DateTime<Utc>> {
        self.resolution_date.or(self.end_date)
    }

    /// Apply freshly fetched metadata on top of this row.
    ///
    /// Fields the source leaves empty keep their stored value. A resolved
    /// market only accepts changes to `outcome` and `resolution_date`, and
    /// never goes back to unresolved.
    pub fn merged_with(&self, meta: &MarketMetadata) -> Market {
        let mut next = self.clone();

        if self.resolved {
            if meta.outcome.is_some() {
                next.outcome = meta.outcome.clone();
            }
            if meta.resolution_date.is_some() {
                next.resolution_date = meta.resolution_date;
            }
            return next;
        }

        if !meta.title.is_empty() {
            next.title = meta.title.clone();
        }
        next.category = meta.category.clone().or(next.category);
        next.end_date = meta.end_date.or(next.end_date);
        next.resolution_date = meta.resolution_date.or(next.resolution_date);
        next.resolved = meta.resolved;
        next.outcome = meta.outcome.clone().or(next.outcome);
        next.total_volume = meta.total_volume.or(next.total_volume);
        next.holder_count = meta.holder_count.or(next.holder_count);
        next
    }

    /// True if the metadata-bearing fields match, ignoring timestamps.
    pub fn same_metadata(&self, other: &Market) -> bool {
        self.title == other.title
            && self.category == other.category
            && self.end_date == other.end_date
            && self.resolution_date == other.resolution_date
            && self.resolved == other.resolved
            && self.outcome == other.outcome
            && self.total_volume == other.total_volume
            && self.holder_count == other.holder_count
    }
}

/// Market metadata as delivered by the source, alongside trades.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketMetadata {
    pub market_id: String,
    pub title: String,
    pub category: Option<String>,
    pub end_date: Option<DateTime<Utc>>,
    pub resolution_date: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub outcome: Option<String>,
    pub total_volume: Option<Decimal>,
    pub holder_count: Option<i32>,
    /// Latest price per outcome label; valuation input for positions.
    #[serde(default)]
    pub outcome_prices: HashMap<String, Decimal>,
}

impl MarketMetadata {
    /// Minimal metadata for a market known only from a trade row.
    pub fn placeholder(market_id: &str, title: Option<&str>) -> Self {
        Self {
            market_id: market_id.to_string(),
            title: title.unwrap_or(market_id).to_string(),
            ..Default::default()
        }
    }

    pub fn into_market(self) -> Market {
        Market {
            market_id: self.market_id,
            title: self.title,
            category: self.category,
            end_date: self.end_date,
            resolution_date: self.resolution_date,
            resolved: self.resolved,
            outcome: self.outcome,
            total_volume: self.total_volume,
            holder_count: self.holder_count,
            created_at: None,
            updated_at: None,
        }
    }

    /// Latest price for an outcome label (case-insensitive).
    pub fn price_of(&self, outcome: &str) -> Option<Decimal> {
        self.outcome_prices
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(outcome))
            .map(|(_, price)| *price)
    }
}
