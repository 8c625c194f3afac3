use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use super::data_client::{DataClient, DataClientError};
use super::gamma_client::{GammaClient, GammaClientError};
use super::types::ApiTrade;
use crate::models::{sort_for_processing, MarketMetadata, TradeEvent, Watermark};

/// Largest page the trade feed serves.
const MAX_PAGE_SIZE: u32 = 500;

#[derive(Debug, Clone, Error)]
pub enum SourceFetchError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for SourceFetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceFetchError::Timeout(e.to_string())
        } else if e.is_decode() {
            SourceFetchError::Unexpected(e.to_string())
        } else {
            SourceFetchError::Http(e.to_string())
        }
    }
}

impl From<DataClientError> for SourceFetchError {
    fn from(e: DataClientError) -> Self {
        match e {
            DataClientError::Http(e) => e.into(),
            DataClientError::Unexpected(msg) => SourceFetchError::Unexpected(msg),
        }
    }
}

impl From<GammaClientError> for SourceFetchError {
    fn from(e: GammaClientError) -> Self {
        match e {
            GammaClientError::Http(e) => e.into(),
            GammaClientError::Unexpected(msg) => SourceFetchError::Unexpected(msg),
        }
    }
}

/// Trades newer than a watermark plus metadata for the markets they touch.
#[derive(Debug, Clone, Default)]
pub struct TradeBatch {
    /// Ascending by (timestamp, tx_hash).
    pub trades: Vec<TradeEvent>,
    /// Keyed by market id. Markets without metadata are absent.
    pub markets: HashMap<String, MarketMetadata>,
}

/// External feed of trades and market metadata.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Up to `limit` trades strictly after `since`, oldest first.
    async fn fetch_trades(
        &self,
        since: Option<&Watermark>,
        limit: usize,
    ) -> Result<TradeBatch, SourceFetchError>;

    /// Current metadata for one market, `None` if the source does not know it.
    async fn fetch_market(&self, market_id: &str) -> Result<Option<MarketMetadata>, SourceFetchError>;
}

/// Polymarket Data API (trades) + Gamma API (market metadata).
#[derive(Debug, Clone)]
pub struct PolymarketSource {
    data: DataClient,
    gamma: GammaClient,
    max_pages: u32,
}

impl PolymarketSource {
    pub fn new(data: DataClient, gamma: GammaClient, max_pages: u32) -> Self {
        Self {
            data,
            gamma,
            max_pages: max_pages.max(1),
        }
    }
}

#[async_trait]
impl MarketDataSource for PolymarketSource {
    async fn fetch_trades(
        &self,
        since: Option<&Watermark>,
        limit: usize,
    ) -> Result<TradeBatch, SourceFetchError> {
        let page_size = (limit as u32).clamp(1, MAX_PAGE_SIZE);
        let mut rows: Vec<ApiTrade> = Vec::new();
        let mut reached_watermark = since.is_none();

        for page in 0..self.max_pages {
            let batch = self.data.get_recent_trades(page_size, page * page_size).await?;
            let exhausted = (batch.len() as u32) < page_size;

            // The feed is newest first: once a page holds a trade at or before the
            // watermark, older pages have nothing new.
            if let Some(mark) = since {
                reached_watermark = batch
                    .iter()
                    .filter_map(ApiTrade::to_event)
                    .any(|event| !mark.precedes(&event));
            }

            rows.extend(batch);
            if reached_watermark || exhausted {
                reached_watermark = true;
                break;
            }
        }

        if !reached_watermark {
            tracing::warn!(
                pages = self.max_pages,
                "Trade feed did not reach the watermark; older trades may be missed"
            );
        }

        let fetched = rows.len();
        let mut trades: Vec<TradeEvent> = rows
            .iter()
            .filter_map(ApiTrade::to_event)
            .filter(|event| since.map_or(true, |mark| mark.precedes(event)))
            .collect();
        let dropped = fetched - trades.len();

        sort_for_processing(&mut trades);
        trades.dedup_by(|a, b| a.tx_hash == b.tx_hash);
        trades.truncate(limit);

        let mut markets = HashMap::new();
        for trade in &trades {
            if markets.contains_key(&trade.market_id) {
                continue;
            }
            match self.fetch_market(&trade.market_id).await {
                Ok(Some(meta)) => {
                    markets.insert(trade.market_id.clone(), meta);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        market = %trade.market_id,
                        error = %e,
                        "Market metadata unavailable; falling back to stored data"
                    );
                }
            }
        }

        tracing::debug!(
            fetched,
            dropped,
            new_trades = trades.len(),
            markets = markets.len(),
            "Fetched trade batch"
        );

        Ok(TradeBatch { trades, markets })
    }

    async fn fetch_market(&self, market_id: &str) -> Result<Option<MarketMetadata>, SourceFetchError> {
        let market = self.gamma.get_market_by_slug(market_id).await?;
        Ok(market.map(|m| m.to_metadata(market_id)))
    }
}
