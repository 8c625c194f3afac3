use reqwest::Client;
use thiserror::Error;

use super::types::ApiTrade;

#[derive(Debug, Error)]
pub enum DataClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone)]
pub struct DataClient {
    http: Client,
    base_url: String,
}

impl DataClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one page of the global trade feed, newest first.
    pub async fn get_recent_trades(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ApiTrade>, DataClientError> {
        let url = format!("{}/trades", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("limit", limit.to_string()), ("offset", offset.to_string())])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = resp.json().await?;
        match body {
            serde_json::Value::Array(_) => serde_json::from_value(body)
                .map_err(|e| DataClientError::Unexpected(e.to_string())),
            other => Err(DataClientError::Unexpected(format!(
                "expected array of trades, got {other}"
            ))),
        }
    }
}
