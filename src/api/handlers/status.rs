//! Service state endpoints: welcome, health

use axum::extract::State;
use axum::response::Response;
use serde::Serialize;
use tracing::warn;

use super::ApiState;
use crate::api::envelope::{ApiErrorResponse, ApiResponse};

// ============================================================================
// Welcome Endpoint
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: &'static str,
    pub version: &'static str,
}

/// GET / - Service banner
pub async fn welcome() -> Response {
    ApiResponse::ok(WelcomeResponse {
        message: "Welcome to the txn-guardian transaction processing service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Health Endpoint
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub judgment_backend: &'static str,
    pub store_backend: &'static str,
    pub stored_records: usize,
    pub runs_completed: u64,
    pub uptime_secs: u64,
}

/// GET /health - Liveness plus backend summary
pub async fn health(State(state): State<ApiState>) -> Response {
    let processor = &state.processor;
    let store = processor.store();

    match store.count() {
        Ok(stored_records) => ApiResponse::ok(HealthResponse {
            status: "ok",
            judgment_backend: processor.orchestrator().gate().backend_name(),
            store_backend: store.backend_name(),
            stored_records,
            runs_completed: processor.orchestrator().runs_completed(),
            uptime_secs: state.started_at.elapsed().as_secs(),
        }),
        Err(e) => {
            warn!(error = %e, "Health check could not reach the store");
            ApiErrorResponse::service_unavailable(format!("store unavailable: {e}"))
        }
    }
}
