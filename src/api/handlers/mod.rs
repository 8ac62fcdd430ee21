//! API route handlers
//!
//! - service status: welcome, health
//! - transactions: ingress, lookup, listing, legacy ingress

mod status;
mod transactions;

pub use status::*;
pub use transactions::*;

use std::sync::Arc;
use std::time::Instant;

use crate::pipeline::TransactionProcessor;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Ingress service (orchestrator + store)
    pub processor: Arc<TransactionProcessor>,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl ApiState {
    pub fn new(processor: Arc<TransactionProcessor>) -> Self {
        Self {
            processor,
            started_at: Instant::now(),
        }
    }
}
