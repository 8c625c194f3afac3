use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::{ApiResponse, Page};
use crate::db::{market_repo, trade_repo};
use crate::errors::AppError;
use crate::models::{Market, Trade};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MarketQuery {
    pub resolved: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<MarketQuery>,
) -> Result<Json<ApiResponse<Vec<Market>>>, AppError> {
    let page = Page {
        limit: q.limit,
        offset: q.offset,
    };
    let markets = market_repo::list_markets(&state.db, q.resolved, page.limit(), page.offset()).await?;
    Ok(ApiResponse::ok(markets))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Market>>, AppError> {
    let market = market_repo::get_market(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("market {id}")))?;
    Ok(ApiResponse::ok(market))
}

pub async fn trades(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<Page>,
) -> Result<Json<ApiResponse<Vec<Trade>>>, AppError> {
    let trades = trade_repo::list_trades(&state.db, None, Some(&id), page.limit(), page.offset()).await?;
    Ok(ApiResponse::ok(trades))
}
