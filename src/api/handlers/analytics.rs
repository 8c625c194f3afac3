use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::api::ApiResponse;
use crate::db::{alert_repo, trade_repo, wallet_repo};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total_wallets: i64,
    pub fresh_wallets: i64,
    pub total_trades: i64,
    pub total_volume: Decimal,
    pub alerts_by_status: BTreeMap<String, i64>,
    /// Share of settled alerts that were won, in percent.
    pub alert_hit_rate: Option<Decimal>,
    pub won_return: Decimal,
    pub lost_return: Decimal,
}

pub async fn summary(State(state): State<AppState>) -> Result<Json<ApiResponse<Summary>>, AppError> {
    let (total_wallets, fresh_wallets) = wallet_repo::count_wallets(&state.db).await?;
    let (total_trades, total_volume) = trade_repo::trade_totals(&state.db).await?;
    let alerts_by_status: BTreeMap<String, i64> =
        alert_repo::count_by_status(&state.db).await?.into_iter().collect();
    let (won_return, lost_return) = alert_repo::settled_returns(&state.db).await?;

    let won = alerts_by_status.get("won").copied().unwrap_or(0);
    let lost = alerts_by_status.get("lost").copied().unwrap_or(0);
    let alert_hit_rate = (won + lost > 0)
        .then(|| (Decimal::from(won) * Decimal::ONE_HUNDRED / Decimal::from(won + lost)).round_dp(1));

    Ok(ApiResponse::ok(Summary {
        total_wallets,
        fresh_wallets,
        total_trades,
        total_volume,
        alerts_by_status,
        alert_hit_rate,
        won_return,
        lost_return,
    }))
}
