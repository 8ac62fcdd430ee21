//! API route definitions
//!
//! - /api/v1/transactions - ingress (POST) and listing (GET)
//! - /api/v1/transactions/:capture_id - single record
//! - /, /health, /process_transaction/ - root-level routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ApiState};

/// Versioned API routes, nested under /api/v1
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::submit_transaction),
        )
        .route("/transactions/:capture_id", get(handlers::get_transaction))
        .with_state(state)
}

/// Root-level routes, including the legacy ingress path
pub fn legacy_routes(state: ApiState) -> Router {
    Router::new()
        .route("/", get(handlers::welcome))
        .route("/health", get(handlers::health))
        .route("/process_transaction/", post(handlers::process_transaction_legacy))
        .with_state(state)
}
