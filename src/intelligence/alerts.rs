use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

use super::scorer::RiskAssessment;
use crate::models::{Alert, AlertStatus, Market, Position, Trade};

/// Build a pending alert for a trade that crossed the threshold.
///
/// Position size is the position's cost basis after the trade; potential
/// payout is what the held shares pay if the outcome wins ($1 per share).
pub fn build_alert(
    trade: &Trade,
    position: &Position,
    market: &Market,
    assessment: &RiskAssessment,
) -> Alert {
    Alert {
        id: Uuid::new_v4(),
        wallet_address: trade.wallet_address.clone(),
        market_id: trade.market_id.clone(),
        trade_id: trade.id,
        tx_hash: trade.tx_hash.clone(),
        risk_score: assessment.score,
        risk_factors: Json(assessment.factors.clone()),
        position_size: position.total_invested,
        potential_payout: position.shares,
        market_resolution_date: market.expected_resolution(),
        status: AlertStatus::Pending.as_str().to_string(),
        actual_return: None,
        flagged_at: Utc::now(),
        settled_at: None,
    }
}

/// Terminal status and realized return for a pending alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub status: AlertStatus,
    pub actual_return: Decimal,
}

/// What the position pays out at resolution: one dollar per share on the winning side.
pub fn resolution_payout(position: &Position, market: &Market) -> Decimal {
    let won = match (position.outcome.as_deref(), market.outcome.as_deref()) {
        (Some(held), Some(winner)) => held.eq_ignore_ascii_case(winner),
        _ => false,
    };
    if won {
        position.shares
    } else {
        Decimal::ZERO
    }
}

/// Settle a pending alert against its resolved market.
///
/// Returns `None` while the market is open or when the alert is already terminal.
/// The return counts P&L realized by earlier sells plus the resolution payout,
/// net of the cost basis still held.
pub fn settle(alert: &Alert, position: Option<&Position>, market: &Market) -> Option<Settlement> {
    if !market.resolved || alert.lifecycle().is_terminal() {
        return None;
    }

    let actual_return = match position {
        Some(p) => p.realized_pnl + resolution_payout(p, market) - p.total_invested,
        None => -alert.position_size,
    };

    let status = if actual_return > Decimal::ZERO {
        AlertStatus::Won
    } else {
        AlertStatus::Lost
    };

    alert.lifecycle().transition(status).ok()?;

    Some(Settlement {
        status,
        actual_return,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
