use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{TradeEvent, Wallet};

/// Thresholds that define a "fresh" wallet. All bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreshnessRules {
    pub max_age_days: i64,
    pub max_trades: i32,
    pub max_position: Decimal,
}

/// Fold one trade into the wallet aggregates.
///
/// `position_cost_basis` is the cost basis of the wallet's position in the
/// traded market after this trade; it feeds the largest-position high-water mark.
pub fn record_trade(
    wallet: &Wallet,
    trade: &TradeEvent,
    realized_pnl: Decimal,
    position_cost_basis: Decimal,
) -> Wallet {
    let mut next = wallet.clone();
    next.total_trades += 1;
    next.total_volume += trade.token_amount;
    next.lifetime_pnl += realized_pnl;
    next.largest_position = next.largest_position.max(position_cost_basis);
    next.first_seen_date = next.first_seen_date.min(trade.timestamp);
    next.last_activity_date = next.last_activity_date.max(trade.timestamp);
    next
}

/// A wallet is fresh while it is young, has few trades, and has never held a large position.
pub fn is_fresh(wallet: &Wallet, as_of: DateTime<Utc>, rules: &FreshnessRules) -> bool {
    let young = as_of - wallet.first_seen_date <= Duration::days(rules.max_age_days);
    let low_activity = wallet.total_trades <= rules.max_trades;
    let small_history = wallet.largest_position <= rules.max_position;

    young && low_activity && small_history
}

/// Re-evaluate the stored freshness flag. Always called on write, never cached.
pub fn classify(wallet: Wallet, as_of: DateTime<Utc>, rules: &FreshnessRules) -> Wallet {
    let fresh = is_fresh(&wallet, as_of, rules);
    Wallet {
        is_fresh: fresh,
        ..wallet
    }
}

/// Summary served alongside a wallet record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletStats {
    pub is_fresh: bool,
    pub total_trades: i32,
    pub total_volume: Decimal,
    pub lifetime_pnl: Decimal,
    pub largest_position: Decimal,
    pub days_active: i64,
    pub first_seen: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

pub fn wallet_stats(wallet: &Wallet, as_of: DateTime<Utc>) -> WalletStats {
    WalletStats {
        is_fresh: wallet.is_fresh,
        total_trades: wallet.total_trades,
        total_volume: wallet.total_volume,
        lifetime_pnl: wallet.lifetime_pnl,
        largest_position: wallet.largest_position,
        days_active: (as_of - wallet.first_seen_date).num_days().max(0),
        first_seen: wallet.first_seen_date,
        last_activity: wallet.last_activity_date,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
