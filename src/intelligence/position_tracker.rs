use rust_decimal::Decimal;

use crate::errors::IngestError;
use crate::models::{MarketMetadata, Position, PositionStatus, TradeEvent, TradeType};

/// Position after one trade, plus the P&L that trade realized.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub position: Position,
    pub realized_pnl: Decimal,
}

/// Apply a trade to the wallet's position in that market.
///
/// Buys blend the average purchase price by shares and add the notional to
/// `total_invested`. Sells remove shares, shrink `total_invested` in
/// proportion, and realize `proceeds − cost basis removed`. Selling more
/// shares than held, or trading the other outcome while shares are held, is
/// an inconsistency: the position is left untouched. A closed position takes
/// the outcome of the next trade that reopens it.
///
/// Remaining shares are marked at the held outcome's price from `metadata`,
/// falling back to the trade price.
pub fn apply_trade(
    existing: Option<&Position>,
    trade: &TradeEvent,
    metadata: Option<&MarketMetadata>,
) -> Result<PositionUpdate, IngestError> {
    let mut position = existing.cloned().unwrap_or_else(|| {
        Position::empty(&trade.wallet, &trade.market_id, trade.outcome.clone(), trade.timestamp)
    });

    if position.shares.is_zero() {
        if trade.outcome.is_some() {
            position.outcome = trade.outcome.clone();
        }
        position.avg_purchase_price = Decimal::ZERO;
    } else if !same_outcome(position.outcome.as_deref(), trade.outcome.as_deref()) {
        return Err(IngestError::outcome_mismatch(
            &trade.wallet,
            &trade.market_id,
            position.outcome.as_deref().unwrap_or_default(),
            trade.outcome.as_deref().unwrap_or_default(),
        ));
    }

    let realized_pnl = match trade.trade_type {
        TradeType::Buy => {
            let new_shares = position.shares + trade.shares;
            if new_shares > Decimal::ZERO {
                position.avg_purchase_price = (position.avg_purchase_price * position.shares
                    + trade.price * trade.shares)
                    / new_shares;
            }
            position.shares = new_shares;
            position.total_invested += trade.token_amount;
            Decimal::ZERO
        }
        TradeType::Sell => {
            if trade.shares > position.shares {
                return Err(IngestError::oversell(
                    &trade.wallet,
                    &trade.market_id,
                    position.shares,
                    trade.shares,
                ));
            }

            let cost_removed = if position.shares.is_zero() {
                Decimal::ZERO
            } else {
                position.total_invested * trade.shares / position.shares
            };
            position.shares -= trade.shares;
            position.total_invested = if position.shares.is_zero() {
                Decimal::ZERO
            } else {
                position.total_invested - cost_removed
            };

            let realized = trade.token_amount - cost_removed;
            position.realized_pnl += realized;
            realized
        }
    };

    let mark_price = position
        .outcome
        .as_deref()
        .and_then(|outcome| metadata.and_then(|meta| meta.price_of(outcome)))
        .unwrap_or(trade.price);
    revalue(&mut position, mark_price);

    Ok(PositionUpdate {
        position,
        realized_pnl,
    })
}

/// Unlabelled trades are taken to be on the held side.
fn same_outcome(held: Option<&str>, traded: Option<&str>) -> bool {
    match (held, traded) {
        (Some(held), Some(traded)) => held.eq_ignore_ascii_case(traded),
        _ => true,
    }
}

/// Recompute value, unrealized P&L and status at the given price.
pub fn revalue(position: &mut Position, mark_price: Decimal) {
    position.current_value = position.shares * mark_price;
    position.unrealized_pnl = position.current_value - position.total_invested;
    position.status = PositionStatus::for_shares(position.shares).as_str().to_string();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
