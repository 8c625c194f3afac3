use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::intelligence::{FreshnessRules, ScoringWeights};

const DEFAULT_DATA_API: &str = "https://data-api.polymarket.com";
const DEFAULT_GAMMA_API: &str = "https://gamma-api.polymarket.com";
const MAX_BURST_WINDOW_HOURS: i64 = 24 * 365;

/// Keys shared by the environment and the `runtime_config` table.
pub mod keys {
    pub const SUSPICIOUS_THRESHOLD: &str = "SUSPICIOUS_THRESHOLD";
    pub const FRESH_WALLET_DAYS: &str = "FRESH_WALLET_DAYS";
    pub const FRESH_WALLET_MAX_TXS: &str = "FRESH_WALLET_MAX_TXS";
    pub const FRESH_WALLET_MAX_POSITION: &str = "FRESH_WALLET_MAX_POSITION";
    pub const COLLECTION_INTERVAL_SECONDS: &str = "COLLECTION_INTERVAL_SECONDS";
    pub const TRADES_FETCH_LIMIT: &str = "TRADES_FETCH_LIMIT";
    pub const SCORING_WEIGHTS: &str = "SCORING_WEIGHTS";
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Display) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Settings that drive scoring and classification. Reloadable between cycles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionConfig {
    pub suspicious_threshold: i32,
    pub fresh_wallet_days: i64,
    pub fresh_wallet_max_txs: i32,
    pub fresh_wallet_max_position: Decimal,
    pub collection_interval_secs: u64,
    pub trades_fetch_limit: u32,
    pub weights: ScoringWeights,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            suspicious_threshold: 20,
            fresh_wallet_days: 30,
            fresh_wallet_max_txs: 20,
            fresh_wallet_max_position: Decimal::from(10_000),
            collection_interval_secs: 300,
            trades_fetch_limit: 1_000,
            weights: ScoringWeights::default(),
        }
    }
}

impl DetectionConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| env::var(key).ok())
    }

    /// Apply `runtime_config` overrides on top of this configuration.
    pub fn with_overrides(&self, overrides: &HashMap<String, String>) -> Result<Self, ConfigError> {
        self.overlay(|key| overrides.get(key).cloned())
    }

    fn overlay(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let weights = match lookup(keys::SCORING_WEIGHTS) {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
                .map_err(|e| ConfigError::invalid(keys::SCORING_WEIGHTS, e))?,
            _ => self.weights.clone(),
        };

        let config = Self {
            suspicious_threshold: parse_or(&lookup, keys::SUSPICIOUS_THRESHOLD, self.suspicious_threshold)?,
            fresh_wallet_days: parse_or(&lookup, keys::FRESH_WALLET_DAYS, self.fresh_wallet_days)?,
            fresh_wallet_max_txs: parse_or(&lookup, keys::FRESH_WALLET_MAX_TXS, self.fresh_wallet_max_txs)?,
            fresh_wallet_max_position: parse_or(
                &lookup,
                keys::FRESH_WALLET_MAX_POSITION,
                self.fresh_wallet_max_position,
            )?,
            collection_interval_secs: parse_or(
                &lookup,
                keys::COLLECTION_INTERVAL_SECONDS,
                self.collection_interval_secs,
            )?,
            trades_fetch_limit: parse_or(&lookup, keys::TRADES_FETCH_LIMIT, self.trades_fetch_limit)?,
            weights,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suspicious_threshold <= 0 {
            return Err(ConfigError::invalid(keys::SUSPICIOUS_THRESHOLD, "must be positive"));
        }
        if self.fresh_wallet_days < 0 {
            return Err(ConfigError::invalid(keys::FRESH_WALLET_DAYS, "must not be negative"));
        }
        if self.fresh_wallet_max_txs < 0 {
            return Err(ConfigError::invalid(keys::FRESH_WALLET_MAX_TXS, "must not be negative"));
        }
        if self.fresh_wallet_max_position < Decimal::ZERO {
            return Err(ConfigError::invalid(keys::FRESH_WALLET_MAX_POSITION, "must not be negative"));
        }
        if self.collection_interval_secs == 0 {
            return Err(ConfigError::invalid(keys::COLLECTION_INTERVAL_SECONDS, "must be at least 1"));
        }
        if self.trades_fetch_limit == 0 {
            return Err(ConfigError::invalid(keys::TRADES_FETCH_LIMIT, "must be at least 1"));
        }
        if !(1..=MAX_BURST_WINDOW_HOURS).contains(&self.weights.burst_window_hours) {
            return Err(ConfigError::invalid(
                keys::SCORING_WEIGHTS,
                format!("burst_window_hours must be within 1..={MAX_BURST_WINDOW_HOURS}"),
            ));
        }
        Ok(())
    }

    pub fn freshness(&self) -> FreshnessRules {
        FreshnessRules {
            max_age_days: self.fresh_wallet_days,
            max_trades: self.fresh_wallet_max_txs,
            max_position: self.fresh_wallet_max_position,
        }
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::invalid(key, e)),
        None => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub log_json: bool,

    // Polymarket endpoints
    pub data_api_url: String,
    pub gamma_api_url: String,

    // Collector
    pub fetch_timeout_secs: u64,
    pub fetch_max_retries: u32,
    pub cycle_timeout_secs: u64,
    pub source_max_pages: u32,

    // Notifications
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub notifications_enabled: bool,

    pub detection: DetectionConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_lookup = |key: &str| env::var(key).ok();

        let config = Self {
            database_url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or(&env_lookup, "PORT", 8000)?,
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),

            data_api_url: env::var("POLYMARKET_DATA_API").unwrap_or_else(|_| DEFAULT_DATA_API.into()),
            gamma_api_url: env::var("POLYMARKET_GAMMA_API").unwrap_or_else(|_| DEFAULT_GAMMA_API.into()),

            fetch_timeout_secs: parse_or(&env_lookup, "FETCH_TIMEOUT_SECS", 30)?,
            fetch_max_retries: parse_or(&env_lookup, "FETCH_MAX_RETRIES", 4)?,
            cycle_timeout_secs: parse_or(&env_lookup, "CYCLE_TIMEOUT_SECS", 240)?,
            source_max_pages: parse_or(&env_lookup, "SOURCE_MAX_PAGES", 5)?,

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            notifications_enabled: parse_or(&env_lookup, "NOTIFICATIONS_ENABLED", false)?,

            detection: DetectionConfig::from_env()?,
        };

        if config.fetch_timeout_secs == 0 {
            return Err(ConfigError::invalid("FETCH_TIMEOUT_SECS", "must be at least 1"));
        }
        if config.cycle_timeout_secs == 0 {
            return Err(ConfigError::invalid("CYCLE_TIMEOUT_SECS", "must be at least 1"));
        }

        Ok(config)
    }

    /// Returns true if Telegram notifications are configured and enabled.
    pub fn has_notifier(&self) -> bool {
        self.notifications_enabled && self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some()
    }
}
