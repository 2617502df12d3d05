use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::api::AppState;
use crate::error::LedgerError;
use crate::ledger::{Record, VerificationReport};

/// Error body returned by every failing handler
pub struct ApiError(LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Ledger request failed: {}", self.0);
        } else {
            warn!("Rejected ledger request: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "entry-ledger",
        "timestamp": chrono::Utc::now()
    }))
}

/// GET /api/ledger
pub async fn get_ledger(State(state): State<AppState>) -> Json<Vec<Record>> {
    Json(state.ledger.load_chain().await)
}

/// POST /api/ledger/events
pub async fn append_event(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let record = state.ledger.append_event(&payload).await?;
    info!("Logged scan event {}", record.summary());
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/ledger/verify
pub async fn verify_ledger(State(state): State<AppState>) -> Json<Value> {
    let report: VerificationReport = state.ledger.verify().await;
    Json(json!({
        "ok": report.is_valid(),
        "message": report.message(),
        "entries": report.entry_count,
        "violation": report.violation,
    }))
}
