//! Transaction endpoints: ingress, lookup, listing

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::ApiState;
use crate::api::envelope::{ApiErrorResponse, ApiResponse};
use crate::pipeline::IngressError;
use crate::storage::MAX_LIST_LIMIT;
use crate::types::TransactionRecord;

const DEFAULT_LIST_LIMIT: usize = 50;

// ============================================================================
// Query types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TransactionPage {
    pub records: Vec<TransactionRecord>,
    pub offset: usize,
    pub limit: usize,
    pub total: usize,
}

// ============================================================================
// Error mapping
// ============================================================================

fn ingress_error_response(err: IngressError) -> Response {
    match err {
        IngressError::Malformed(issues) => {
            ApiErrorResponse::unprocessable("payload failed structural validation", issues)
        }
        e @ (IngressError::AlreadyInFlight(_) | IngressError::AlreadyProcessed(_)) => {
            ApiErrorResponse::conflict(e.to_string())
        }
        IngressError::Persistence(e) => {
            error!(error = %e, "Failed to persist final record");
            ApiErrorResponse::internal(format!("failed to persist record: {e}"))
        }
        IngressError::Interrupted(e) => ApiErrorResponse::service_unavailable(e.to_string()),
    }
}

async fn ingest(
    state: &ApiState,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<TransactionRecord, Response> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected unparseable request body");
        ApiErrorResponse::rejected(rejection.status(), rejection.body_text())
    })?;

    state
        .processor
        .submit_json(&payload)
        .await
        .map_err(ingress_error_response)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/transactions - Run a transaction through the pipeline
pub async fn submit_transaction(
    State(state): State<ApiState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    match ingest(&state, payload).await {
        Ok(record) => ApiResponse::ok(record),
        Err(resp) => resp,
    }
}

/// POST /process_transaction/ - Legacy ingress returning the bare record
pub async fn process_transaction_legacy(
    State(state): State<ApiState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Response {
    match ingest(&state, payload).await {
        Ok(record) => Json(record).into_response(),
        Err(resp) => resp,
    }
}

/// GET /api/v1/transactions/:capture_id - One stored record
pub async fn get_transaction(
    State(state): State<ApiState>,
    Path(capture_id): Path<String>,
) -> Response {
    match state.processor.store().get_by_id(&capture_id) {
        Ok(Some(record)) => ApiResponse::ok(record),
        Ok(None) => ApiErrorResponse::not_found(format!("no transaction with captureId {capture_id}")),
        Err(e) => {
            error!(capture_id = %capture_id, error = %e, "Store lookup failed");
            ApiErrorResponse::internal(e.to_string())
        }
    }
}

/// GET /api/v1/transactions - Stored records, newest first
pub async fn list_transactions(
    State(state): State<ApiState>,
    Query(q): Query<ListQuery>,
) -> Response {
    let offset = q.offset.unwrap_or(0);
    let limit = q.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    let store = state.processor.store();

    let page = store
        .list(offset, limit)
        .and_then(|records| Ok((records, store.count()?)));

    match page {
        Ok((records, total)) => ApiResponse::ok(TransactionPage {
            records,
            offset,
            limit,
            total,
        }),
        Err(e) => {
            error!(error = %e, "Store listing failed");
            ApiErrorResponse::internal(e.to_string())
        }
    }
}
