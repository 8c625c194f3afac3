use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use metrics::{counter, histogram};
use rust_decimal::Decimal;

use crate::config::DetectionConfig;
use crate::db::{CommitResult, Repository, TradeCommit};
use crate::errors::IngestError;
use crate::intelligence::{
    apply_trade, build_alert, classify, record_trade, score_trade, ScoringContext, WalletHistory,
};
use crate::metrics as m;
use crate::models::{
    processing_status, Alert, Market, MarketMetadata, Position, Trade, TradeEvent, TradeType, Wallet,
};

/// What happened to one trade.
#[derive(Debug, Clone)]
pub enum TradeOutcome {
    /// Stored and scored below the threshold.
    Processed { trade: Trade, score: i32 },
    /// Stored, scored at or above the threshold, alert raised.
    Alerted {
        trade: Trade,
        alert: Alert,
        market: Market,
    },
    /// Stored for the record, not applied to the position and not scored.
    Quarantined { trade: Trade, reason: String },
    /// tx hash already stored; nothing written.
    Duplicate,
}

/// Run one trade through classification, position tracking, scoring and
/// alerting, then persist the result as a single unit.
///
/// `metadata` is the source's view of the trade's market, if any. `as_of`
/// is the clock used for wallet freshness.
pub async fn process_trade(
    repo: &dyn Repository,
    config: &DetectionConfig,
    event: &TradeEvent,
    metadata: Option<&MarketMetadata>,
    as_of: DateTime<Utc>,
) -> Result<TradeOutcome, IngestError> {
    let start = Instant::now();

    if repo.trade_exists(&event.tx_hash).await.map_err(IngestError::Persistence)? {
        tracing::debug!(tx = %event.tx_hash, "Trade already stored, skipping");
        counter!(m::DUPLICATE_TRADES).increment(1);
        return Ok(TradeOutcome::Duplicate);
    }

    let market = sync_market(repo, event, metadata).await?;

    let wallet_before = repo
        .get_wallet(&event.wallet)
        .await
        .map_err(IngestError::Persistence)?
        .unwrap_or_else(|| Wallet::first_seen(&event.wallet, event.timestamp));
    let existing = repo
        .get_position(&event.wallet, &event.market_id)
        .await
        .map_err(IngestError::Persistence)?;

    let freshness = config.freshness();

    let update = match apply_trade(existing.as_ref(), event, metadata) {
        Ok(update) => update,
        Err(IngestError::InconsistentPosition { reason, .. }) => {
            return quarantine(repo, event, &wallet_before, existing.as_ref(), reason, as_of, config).await;
        }
        Err(e) => return Err(e),
    };

    let wallet = classify(
        record_trade(&wallet_before, event, update.realized_pnl, update.position.total_invested),
        as_of,
        &freshness,
    );

    let history = wallet_history(repo, config, event, &wallet_before, &update.position).await?;

    let assessment = score_trade(
        &ScoringContext {
            trade: event,
            wallet: &wallet,
            position: &update.position,
            market: &market,
            history: &history,
        },
        &config.weights,
    );

    let trade = Trade::from_event(event, processing_status::PROCESSED);
    // Sells shrink exposure and never raise an alert
    let escalate = event.trade_type == TradeType::Buy && assessment.is_suspicious(config.suspicious_threshold);
    let alert = escalate.then(|| build_alert(&trade, &update.position, &market, &assessment));

    let result = repo
        .commit_trade(TradeCommit {
            trade,
            wallet,
            position: Some(update.position),
            alert,
            watermark: event.cursor(),
        })
        .await
        .map_err(IngestError::Persistence)?;

    histogram!(m::PIPELINE_LATENCY).record(start.elapsed().as_secs_f64());

    match result {
        CommitResult::Duplicate => {
            counter!(m::DUPLICATE_TRADES).increment(1);
            Ok(TradeOutcome::Duplicate)
        }
        CommitResult::Committed {
            trade,
            alert: Some(alert),
        } => {
            counter!(m::TRADES_INGESTED).increment(1);
            counter!(m::ALERTS_CREATED).increment(1);
            tracing::warn!(
                wallet = %alert.wallet_address,
                market = %alert.market_id,
                score = alert.risk_score,
                position_size = %alert.position_size,
                factors = ?alert.risk_factors.0,
                "Suspicious trade flagged"
            );
            Ok(TradeOutcome::Alerted {
                trade,
                alert,
                market,
            })
        }
        CommitResult::Committed { trade, alert: None } => {
            counter!(m::TRADES_INGESTED).increment(1);
            tracing::debug!(
                tx = %trade.tx_hash,
                wallet = %trade.wallet_address,
                score = assessment.score,
                "Trade processed"
            );
            Ok(TradeOutcome::Processed {
                trade,
                score: assessment.score,
            })
        }
    }
}

/// Make sure the trade's market exists and reflects the latest metadata.
async fn sync_market(
    repo: &dyn Repository,
    event: &TradeEvent,
    metadata: Option<&MarketMetadata>,
) -> Result<Market, IngestError> {
    let stored = repo
        .get_market(&event.market_id)
        .await
        .map_err(IngestError::Persistence)?;

    let next = match (&stored, metadata) {
        (Some(stored), Some(meta)) => stored.merged_with(meta),
        (Some(stored), None) => return Ok(stored.clone()),
        (None, Some(meta)) => meta.clone().into_market(),
        (None, None) => {
            MarketMetadata::placeholder(&event.market_id, event.market_title.as_deref()).into_market()
        }
    };

    if let Some(stored) = &stored {
        if stored.same_metadata(&next) {
            return Ok(next);
        }
        if next.resolved && !stored.resolved {
            tracing::info!(
                market = %next.market_id,
                outcome = ?next.outcome,
                "Market resolved"
            );
        }
    }

    repo.save_market(&next).await.map_err(IngestError::Persistence)
}

/// Prior-activity features for the scorer.
async fn wallet_history(
    repo: &dyn Repository,
    config: &DetectionConfig,
    event: &TradeEvent,
    wallet_before: &Wallet,
    position: &Position,
) -> Result<WalletHistory, IngestError> {
    let window_start = event.timestamp - Duration::hours(config.weights.burst_window_hours);
    let recent = repo
        .count_trades_since(&event.wallet, window_start)
        .await
        .map_err(IngestError::Persistence)?;

    let open = repo
        .open_positions(&event.wallet)
        .await
        .map_err(IngestError::Persistence)?;
    let elsewhere: Decimal = open
        .iter()
        .filter(|p| p.market_id != event.market_id)
        .map(|p| p.current_value)
        .sum();

    Ok(WalletHistory {
        prior_trades: wallet_before.total_trades,
        prior_average_size: wallet_before.average_trade_size(),
        recent_trades: recent + 1,
        portfolio_value: elsewhere + position.current_value,
    })
}

/// Record a trade that cannot be applied to its position. Wallet activity
/// still counts; the position is left as it was.
async fn quarantine(
    repo: &dyn Repository,
    event: &TradeEvent,
    wallet_before: &Wallet,
    existing: Option<&Position>,
    reason: String,
    as_of: DateTime<Utc>,
    config: &DetectionConfig,
) -> Result<TradeOutcome, IngestError> {
    tracing::warn!(
        tx = %event.tx_hash,
        wallet = %event.wallet,
        market = %event.market_id,
        reason = %reason,
        "Inconsistent position, quarantining trade"
    );

    let cost_basis = existing.map(|p| p.total_invested).unwrap_or(Decimal::ZERO);
    let wallet = classify(
        record_trade(wallet_before, event, Decimal::ZERO, cost_basis),
        as_of,
        &config.freshness(),
    );

    let result = repo
        .commit_trade(TradeCommit {
            trade: Trade::from_event(event, processing_status::QUARANTINED),
            wallet,
            position: None,
            alert: None,
            watermark: event.cursor(),
        })
        .await
        .map_err(IngestError::Persistence)?;

    match result {
        CommitResult::Committed { trade, .. } => {
            counter!(m::QUARANTINED_TRADES).increment(1);
            Ok(TradeOutcome::Quarantined { trade, reason })
        }
        CommitResult::Duplicate => {
            counter!(m::DUPLICATE_TRADES).increment(1);
            Ok(TradeOutcome::Duplicate)
        }
    }
}
