use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Named factor → point contribution. Ordered so the persisted breakdown is stable.
pub type RiskFactors = BTreeMap<String, i32>;

/// Database row for alerts table. At most one per triggering trade.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alert {
    pub id: Uuid,
    pub wallet_address: String,
    pub market_id: String,
    pub trade_id: Uuid,
    pub tx_hash: String,
    pub risk_score: i32,
    pub risk_factors: Json<RiskFactors>,
    pub position_size: Decimal,
    pub potential_payout: Decimal,
    pub market_resolution_date: Option<DateTime<Utc>>,
    pub status: String,
    pub actual_return: Option<Decimal>,
    pub flagged_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Parsed lifecycle status. Unknown strings are treated as pending.
    pub fn lifecycle(&self) -> AlertStatus {
        AlertStatus::from_str(&self.status).unwrap_or(AlertStatus::Pending)
    }
}

/// Alert lifecycle. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Won,
    Lost,
    Dismissed,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("alert cannot move from {from} to {to}")]
pub struct AlertTransitionError {
    pub from: AlertStatus,
    pub to: AlertStatus,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Won => "won",
            AlertStatus::Lost => "lost",
            AlertStatus::Dismissed => "dismissed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(AlertStatus::Pending),
            "won" => Some(AlertStatus::Won),
            "lost" => Some(AlertStatus::Lost),
            "dismissed" => Some(AlertStatus::Dismissed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AlertStatus::Pending)
    }

    /// Validate a lifecycle move: pending → won | lost | dismissed, nothing else.
    pub fn transition(self, to: AlertStatus) -> Result<AlertStatus, AlertTransitionError> {
        match (self, to) {
            (AlertStatus::Pending, AlertStatus::Won)
            | (AlertStatus::Pending, AlertStatus::Lost)
            | (AlertStatus::Pending, AlertStatus::Dismissed) => Ok(to),
            _ => Err(AlertTransitionError { from: self, to }),
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
