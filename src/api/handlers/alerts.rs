use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiResponse, Page};
use crate::db::{alert_repo, DismissOutcome};
use crate::errors::AppError;
use crate::models::{Alert, AlertStatus};
use crate::services::dismiss_alert;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub status: Option<String>,
    pub min_score: Option<i32>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<AlertQuery>,
) -> Result<Json<ApiResponse<Vec<Alert>>>, AppError> {
    let status = match q.status.as_deref() {
        Some(s) => Some(
            AlertStatus::from_str(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown alert status '{s}'")))?,
        ),
        None => None,
    };
    let page = Page {
        limit: q.limit,
        offset: q.offset,
    };

    let alerts =
        alert_repo::list_alerts(&state.db, status, q.min_score, page.limit(), page.offset()).await?;
    Ok(ApiResponse::ok(alerts))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    let alert = alert_repo::get_alert(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("alert {id}")))?;
    Ok(ApiResponse::ok(alert))
}

/// `POST /api/alerts/:id/dismiss`. Only pending alerts can be dismissed.
pub async fn dismiss(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    match dismiss_alert(state.repo.as_ref(), id).await? {
        DismissOutcome::Dismissed(alert) => Ok(ApiResponse::ok(alert)),
        DismissOutcome::NotFound => Err(AppError::NotFound(format!("alert {id}"))),
        DismissOutcome::AlreadyTerminal(status) => Err(AppError::Conflict(format!(
            "alert {id} is already {status}"
        ))),
    }
}
