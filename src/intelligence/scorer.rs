use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Market, Position, RiskFactors, TradeEvent, TradeType, Wallet};

/// One step of a stepped factor: crossing `threshold` earns `points`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub threshold: Decimal,
    pub points: i32,
}

impl Tier {
    pub fn new(threshold: Decimal, points: i32) -> Self {
        Self { threshold, points }
    }
}

/// Tunable weights for every risk factor. Missing JSON fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Flat contribution when the wallet is fresh.
    pub fresh_wallet_points: i32,

    /// Buy notional in USD, at-least tiers.
    pub position_size_tiers: Vec<Tier>,

    /// Trade notional vs the wallet's prior average trade size.
    pub size_anomaly_multiple: Decimal,
    pub size_anomaly_min_history: i32,
    pub size_anomaly_points: i32,

    /// Hours until resolution, at-most tiers.
    pub timing_tiers_hours: Vec<Tier>,

    pub niche_volume_below: Decimal,
    pub niche_volume_points: i32,
    pub niche_holders_below: i32,
    pub niche_holders_points: i32,
    pub niche_categories: Vec<String>,
    pub niche_category_points: i32,

    /// Position value as a fraction of the wallet portfolio, at-least tiers.
    pub concentration_tiers: Vec<Tier>,
    pub concentration_min_value: Decimal,

    /// Purchase price, strictly-below tiers. Buys only.
    pub payout_price_tiers: Vec<Tier>,

    pub burst_window_hours: i64,
    pub burst_min_trades: i64,
    pub burst_points: i32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            fresh_wallet_points: 5,
            position_size_tiers: vec![
                Tier::new(Decimal::from(5_000), 4),
                Tier::new(Decimal::from(10_000), 6),
                Tier::new(Decimal::from(20_000), 8),
                Tier::new(Decimal::from(50_000), 10),
            ],
            size_anomaly_multiple: Decimal::from(5),
            size_anomaly_min_history: 3,
            size_anomaly_points: 3,
            timing_tiers_hours: vec![
                Tier::new(Decimal::from(24), 10),
                Tier::new(Decimal::from(72), 7),
                Tier::new(Decimal::from(120), 5),
                Tier::new(Decimal::from(168), 3),
            ],
            niche_volume_below: Decimal::from(50_000),
            niche_volume_points: 3,
            niche_holders_below: 100,
            niche_holders_points: 2,
            niche_categories: vec![
                "politics-international".into(),
                "business".into(),
                "legal".into(),
                "geopolitics".into(),
            ],
            niche_category_points: 2,
            concentration_tiers: vec![
                Tier::new(Decimal::new(50, 2), 3),
                Tier::new(Decimal::new(90, 2), 5),
            ],
            concentration_min_value: Decimal::from(1_000),
            payout_price_tiers: vec![
                Tier::new(Decimal::new(25, 2), 8),
                Tier::new(Decimal::new(35, 2), 5),
                Tier::new(Decimal::new(50, 2), 3),
            ],
            burst_window_hours: 24,
            burst_min_trades: 3,
            burst_points: 5,
        }
    }
}

/// Wallet activity derived from stored history, as of just before this trade.
#[derive(Debug, Clone, Default)]
pub struct WalletHistory {
    pub prior_trades: i32,
    pub prior_average_size: Decimal,
    /// Trades inside the burst window, including this one.
    pub recent_trades: i64,
    /// Sum of current values across the wallet's open positions, after this trade.
    pub portfolio_value: Decimal,
}

/// Snapshots the scorer reads. Wallet and position reflect this trade already applied.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub trade: &'a TradeEvent,
    pub wallet: &'a Wallet,
    pub position: &'a Position,
    pub market: &'a Market,
    pub history: &'a WalletHistory,
}

/// Composite score plus the per-factor breakdown persisted with an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: i32,
    pub factors: RiskFactors,
}

impl RiskAssessment {
    pub fn is_suspicious(&self, threshold: i32) -> bool {
        self.score >= threshold
    }
}

type FactorFn = fn(&ScoringContext<'_>, &ScoringWeights) -> i32;

/// Every factor, computed independently and summed.
pub const FACTORS: &[(&str, FactorFn)] = &[
    ("fresh_wallet", fresh_wallet),
    ("position_size", position_size),
    ("size_vs_history", size_vs_history),
    ("time_to_resolution", time_to_resolution),
    ("market_niche", market_niche),
    ("concentration", concentration),
    ("payout_ratio", payout_ratio),
    ("burst_trading", burst_trading),
];

/// Score a trade. Pure: identical snapshots always give identical output.
pub fn score_trade(ctx: &ScoringContext<'_>, weights: &ScoringWeights) -> RiskAssessment {
    let factors: RiskFactors = FACTORS
        .iter()
        .map(|(name, factor)| (name.to_string(), factor(ctx, weights)))
        .collect();
    let score = factors.values().sum();

    RiskAssessment { score, factors }
}

// ---------------------------------------------------------------------------
// Tier helpers (order-independent)
// ---------------------------------------------------------------------------

fn tier_at_least(value: Decimal, tiers: &[Tier]) -> i32 {
    tiers
        .iter()
        .filter(|t| value >= t.threshold)
        .map(|t| t.points)
        .max()
        .unwrap_or(0)
}

fn tier_within(value: Decimal, tiers: &[Tier]) -> i32 {
    tiers
        .iter()
        .filter(|t| value <= t.threshold)
        .map(|t| t.points)
        .max()
        .unwrap_or(0)
}

fn tier_below(value: Decimal, tiers: &[Tier]) -> i32 {
    tiers
        .iter()
        .filter(|t| value < t.threshold)
        .map(|t| t.points)
        .max()
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Factors
// ---------------------------------------------------------------------------

fn fresh_wallet(ctx: &ScoringContext<'_>, w: &ScoringWeights) -> i32 {
    if ctx.wallet.is_fresh {
        w.fresh_wallet_points
    } else {
        0
    }
}

fn position_size(ctx: &ScoringContext<'_>, w: &ScoringWeights) -> i32 {
    if ctx.trade.trade_type != TradeType::Buy {
        return 0;
    }
    tier_at_least(ctx.trade.token_amount, &w.position_size_tiers)
}

fn size_vs_history(ctx: &ScoringContext<'_>, w: &ScoringWeights) -> i32 {
    let h = ctx.history;
    if h.prior_trades < w.size_anomaly_min_history || h.prior_average_size <= Decimal::ZERO {
        return 0;
    }
    if ctx.trade.token_amount >= h.prior_average_size * w.size_anomaly_multiple {
        w.size_anomaly_points
    } else {
        0
    }
}

fn time_to_resolution(ctx: &ScoringContext<'_>, w: &ScoringWeights) -> i32 {
    let Some(resolves_at) = ctx.market.expected_resolution() else {
        return 0;
    };
    let seconds = (resolves_at - ctx.trade.timestamp).num_seconds();
    if seconds < 0 {
        return 0;
    }
    let hours = Decimal::from(seconds) / Decimal::from(3_600);
    tier_within(hours, &w.timing_tiers_hours)
}

fn market_niche(ctx: &ScoringContext<'_>, w: &ScoringWeights) -> i32 {
    let market = ctx.market;
    let mut score = 0;

    if matches!(market.total_volume, Some(v) if v < w.niche_volume_below) {
        score += w.niche_volume_points;
    }
    if matches!(market.holder_count, Some(h) if h < w.niche_holders_below) {
        score += w.niche_holders_points;
    }
    if let Some(category) = market.category.as_deref() {
        if w.niche_categories.iter().any(|c| c.eq_ignore_ascii_case(category)) {
            score += w.niche_category_points;
        }
    }

    score
}

fn concentration(ctx: &ScoringContext<'_>, w: &ScoringWeights) -> i32 {
    let value = ctx.position.current_value;
    let portfolio = ctx.history.portfolio_value;
    if portfolio <= Decimal::ZERO || value < w.concentration_min_value {
        return 0;
    }
    tier_at_least(value / portfolio, &w.concentration_tiers)
}

fn payout_ratio(ctx: &ScoringContext<'_>, w: &ScoringWeights) -> i32 {
    if ctx.trade.trade_type != TradeType::Buy || ctx.trade.price <= Decimal::ZERO {
        return 0;
    }
    tier_below(ctx.trade.price, &w.payout_price_tiers)
}

fn burst_trading(ctx: &ScoringContext<'_>, w: &ScoringWeights) -> i32 {
    if ctx.history.recent_trades >= w.burst_min_trades {
        w.burst_points
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
