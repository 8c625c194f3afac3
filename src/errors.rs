use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::polymarket::SourceFetchError;

/// Failures of the ingestion pipeline. Duplicate trades are an outcome, not an error.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Source unreachable or returned garbage; the cycle is aborted and retried.
    #[error("source fetch failed: {0}")]
    SourceFetch(#[from] SourceFetchError),

    /// A trade that cannot be applied to its position; quarantined, never retried.
    #[error("inconsistent position for {wallet} in {market_id}: {reason}")]
    InconsistentPosition {
        wallet: String,
        market_id: String,
        reason: String,
    },

    /// Repository write failed; the trade's unit of work is rolled back and retried next cycle.
    #[error("persistence failed: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl IngestError {
    pub fn oversell(wallet: &str, market_id: &str, held: Decimal, requested: Decimal) -> Self {
        IngestError::InconsistentPosition {
            wallet: wallet.to_string(),
            market_id: market_id.to_string(),
            reason: format!("sell of {requested} shares exceeds {held} held"),
        }
    }

    pub fn outcome_mismatch(wallet: &str, market_id: &str, held: &str, traded: &str) -> Self {
        IngestError::InconsistentPosition {
            wallet: wallet.to_string(),
            market_id: market_id.to_string(),
            reason: format!("trade on {traded} while holding {held}"),
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, IngestError::InconsistentPosition { .. })
    }
}

/// Errors surfaced by the read API.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}
