use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::MarketMetadata;

#[derive(Debug, Error)]
pub enum GammaClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GammaMarket {
    #[serde(default)]
    pub condition_id: Option<String>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub closed_time: Option<String>,
    #[serde(default)]
    pub closed: Option<bool>,
    /// JSON array of outcome labels, e.g. `["Yes","No"]`
    #[serde(default)]
    pub outcomes: Option<String>,
    /// Stringified JSON array of prices aligned with `outcomes`, e.g. `["0.93","0.07"]`
    #[serde(default)]
    pub outcome_prices: Option<String>,
    /// String or number depending on the endpoint.
    #[serde(default)]
    pub volume: Option<serde_json::Value>,
    /// Distinct traders, when Gamma reports it.
    #[serde(default)]
    pub participants: Option<serde_json::Value>,
}

impl GammaMarket {
    /// Parse the stringified outcomes into labels.
    pub fn outcome_labels(&self) -> Vec<String> {
        self.outcomes
            .as_deref()
            .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
            .unwrap_or_default()
    }

    /// Outcome label → latest price.
    pub fn prices(&self) -> HashMap<String, Decimal> {
        let prices: Vec<String> = self
            .outcome_prices
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        self.outcome_labels()
            .into_iter()
            .zip(prices)
            .filter_map(|(label, price)| Some((label, price.parse::<Decimal>().ok()?)))
            .collect()
    }

    /// Winning outcome of a closed market: the label priced at 1.
    pub fn winning_outcome(&self) -> Option<String> {
        if !self.closed.unwrap_or(false) {
            return None;
        }
        self.prices()
            .into_iter()
            .find(|(_, price)| *price == Decimal::ONE)
            .map(|(label, _)| label)
    }

    pub fn total_volume(&self) -> Option<Decimal> {
        match self.volume.as_ref()? {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.to_string().parse().ok(),
            _ => None,
        }
    }

    pub fn holder_count(&self) -> Option<i32> {
        match self.participants.as_ref()? {
            serde_json::Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Map onto the metadata shape used by the pipeline, keyed by `market_id`.
    pub fn to_metadata(&self, market_id: &str) -> MarketMetadata {
        let outcome = self.winning_outcome();
        let resolved = outcome.is_some();

        MarketMetadata {
            market_id: market_id.to_string(),
            title: self
                .question
                .clone()
                .filter(|q| !q.is_empty())
                .unwrap_or_else(|| market_id.to_string()),
            category: self.category.clone().filter(|c| !c.is_empty()),
            end_date: parse_gamma_date(self.end_date.as_deref()),
            resolution_date: if resolved {
                parse_gamma_date(self.closed_time.as_deref())
                    .or_else(|| parse_gamma_date(self.end_date.as_deref()))
            } else {
                None
            },
            resolved,
            outcome,
            total_volume: self.total_volume(),
            holder_count: self.holder_count(),
            outcome_prices: self.prices(),
        }
    }
}

/// Gamma mixes RFC 3339 (`endDate`) with `2024-11-06 02:14:09+00` (`closedTime`).
fn parse_gamma_date(s: Option<&str>) -> Option<DateTime<Utc>> {
    let s = s?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[derive(Debug, Clone)]
pub struct GammaClient {
    http: Client,
    base_url: String,
}

impl GammaClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one market by slug. Gamma answers with a (possibly empty) array.
    pub async fn get_market_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<GammaMarket>, GammaClientError> {
        let url = format!("{}/markets", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("slug", slug)])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = resp.json().await?;
        let markets: Vec<GammaMarket> = match body {
            serde_json::Value::Array(_) => serde_json::from_value(body)
                .map_err(|e| GammaClientError::Unexpected(e.to_string()))?,
            other => {
                return Err(GammaClientError::Unexpected(format!(
                    "expected array of markets, got {other}"
                )))
            }
        };

        Ok(markets.into_iter().next())
    }
}
