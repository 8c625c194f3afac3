use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::{ApiResponse, Page};
use crate::db::{position_repo, trade_repo, wallet_repo};
use crate::errors::AppError;
use crate::intelligence::{wallet_stats, WalletStats};
use crate::models::{Position, Trade, Wallet};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    #[serde(default)]
    pub fresh: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl WalletQuery {
    fn page(&self) -> Page {
        Page {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletDetail {
    pub wallet: Wallet,
    pub stats: WalletStats,
}

#[derive(Debug, Deserialize)]
pub struct PositionQuery {
    #[serde(default)]
    pub open_only: bool,
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<WalletQuery>,
) -> Result<Json<ApiResponse<Vec<Wallet>>>, AppError> {
    let page = q.page();
    let wallets = wallet_repo::list_wallets(&state.db, q.fresh, page.limit(), page.offset()).await?;
    Ok(ApiResponse::ok(wallets))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<WalletDetail>>, AppError> {
    let address = address.to_lowercase();
    let wallet = wallet_repo::get_wallet(&state.db, &address)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("wallet {address}")))?;

    let stats = wallet_stats(&wallet, Utc::now());
    Ok(ApiResponse::ok(WalletDetail { wallet, stats }))
}

pub async fn trades(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(page): Query<Page>,
) -> Result<Json<ApiResponse<Vec<Trade>>>, AppError> {
    let address = address.to_lowercase();
    let trades =
        trade_repo::list_trades(&state.db, Some(&address), None, page.limit(), page.offset()).await?;
    Ok(ApiResponse::ok(trades))
}

pub async fn positions(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(q): Query<PositionQuery>,
) -> Result<Json<ApiResponse<Vec<Position>>>, AppError> {
    let address = address.to_lowercase();
    let positions = position_repo::get_wallet_positions(&state.db, &address, q.open_only).await?;
    Ok(ApiResponse::ok(positions))
}
