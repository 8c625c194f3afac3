use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::{ApiResponse, Page};
use crate::db::trade_repo;
use crate::errors::AppError;
use crate::models::Trade;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TradeQuery {
    pub wallet: Option<String>,
    pub market: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<TradeQuery>,
) -> Result<Json<ApiResponse<Vec<Trade>>>, AppError> {
    let page = Page {
        limit: q.limit,
        offset: q.offset,
    };
    let wallet = q.wallet.map(|w| w.to_lowercase());

    let trades = trade_repo::list_trades(
        &state.db,
        wallet.as_deref(),
        q.market.as_deref(),
        page.limit(),
        page.offset(),
    )
    .await?;
    Ok(ApiResponse::ok(trades))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<Json<ApiResponse<Trade>>, AppError> {
    let tx_hash = tx_hash.to_lowercase();
    let trade = trade_repo::get_trade_by_hash(&state.db, &tx_hash)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trade {tx_hash}")))?;
    Ok(ApiResponse::ok(trade))
}
