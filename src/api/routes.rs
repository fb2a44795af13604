//! API route handlers.
//!
//! Responses carry no body; the status code is the whole answer.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};

use crate::engine::IngestionService;
use crate::types::{BetSubmission, LedgerError};

/// Header carrying the source label of a submitted bet.
pub const SOURCE_TYPE_HEADER: &str = "Source-Type";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct ApiState {
    pub ingestion: IngestionService,
}

pub type AppState = Arc<ApiState>;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `POST /bet`.
#[derive(Debug, Clone, Deserialize)]
pub struct BetPayload {
    /// `win` or `lost`.
    #[serde(alias = "State")]
    pub state: String,
    /// Decimal amount as a string, e.g. `"15.5"`.
    #[serde(alias = "Amount")]
    pub amount: String,
    #[serde(rename = "betId", alias = "BetID", alias = "bet_id")]
    pub bet_id: String,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /bet
pub async fn post_bet(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let payload: BetPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Undecodable bet payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let source = headers
        .get(SOURCE_TYPE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let external_id = payload.bet_id.clone();
    let submission = BetSubmission {
        external_id: payload.bet_id,
        outcome: payload.state,
        amount: payload.amount,
        source,
    };

    // Detached from the request so a dropped connection cannot cancel
    // the transaction half way through.
    let service = state.ingestion.clone();
    let joined = tokio::spawn(async move { service.ingest(&submission).await }).await;

    match joined {
        Ok(Ok(_)) => StatusCode::OK,
        Ok(Err(e)) => {
            let status = status_for(&e);
            if status.is_client_error() {
                warn!(external_id = %external_id, error = %e, "Bet rejected");
            } else {
                error!(external_id = %external_id, error = %e, "Bet ingestion failed");
            }
            status
        }
        Err(e) => {
            error!(external_id = %external_id, error = %e, "Ingestion task panicked");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub fn status_for(err: &LedgerError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
