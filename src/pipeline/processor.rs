//! TransactionProcessor - the ingress service
//!
//! Sequence per submission:
//! 1. structural payload check ([`parse_payload`])
//! 2. claim the capture id (rejects concurrent duplicates)
//! 3. reject ids that already have a stored record
//! 4. build a fresh record and run the orchestrator
//! 5. stamp `processedAt` and save once

use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::intake::{parse_payload, FieldIssue};
use super::orchestrator::{Orchestrator, PipelineError};
use crate::storage::{PersistenceError, TransactionStore};
use crate::types::{Transaction, TransactionRecord};

/// Ingress errors
#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("malformed payload: {} issue(s)", .0.len())]
    Malformed(Vec<FieldIssue>),
    #[error("transaction {0} is already being processed")]
    AlreadyInFlight(String),
    #[error("transaction {0} has already been processed")]
    AlreadyProcessed(String),
    #[error(transparent)]
    Persistence(PersistenceError),
    #[error(transparent)]
    Interrupted(#[from] PipelineError),
}

impl From<PersistenceError> for IngressError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::Conflict(id) => Self::AlreadyProcessed(id),
            other => Self::Persistence(other),
        }
    }
}

/// Submission entry point shared by the HTTP and stdin front ends.
pub struct TransactionProcessor {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn TransactionStore>,
    in_flight: Mutex<HashSet<String>>,
}

impl TransactionProcessor {
    pub fn new(orchestrator: Arc<Orchestrator>, store: Arc<dyn TransactionStore>) -> Self {
        Self {
            orchestrator,
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &dyn TransactionStore {
        self.store.as_ref()
    }

    /// Check a raw JSON payload, then process it.
    pub async fn submit_json(
        &self,
        payload: &serde_json::Value,
    ) -> Result<TransactionRecord, IngressError> {
        let transaction = parse_payload(payload).map_err(IngressError::Malformed)?;
        self.submit(transaction).await
    }

    /// Process a structurally valid transaction to a stored final record.
    pub async fn submit(&self, transaction: Transaction) -> Result<TransactionRecord, IngressError> {
        let _claim = self.claim(&transaction)?;
        let record = self
            .orchestrator
            .execute(TransactionRecord::new(transaction))
            .await;
        self.store_final(record)
    }

    /// [`submit`](Self::submit) with cooperative cancellation. A cancelled run
    /// is not stored.
    pub async fn submit_with_cancel(
        &self,
        transaction: Transaction,
        token: &CancellationToken,
    ) -> Result<TransactionRecord, IngressError> {
        let _claim = self.claim(&transaction)?;
        let trace = self
            .orchestrator
            .execute_with_cancel(TransactionRecord::new(transaction), token)
            .await?;
        self.store_final(trace.record)
    }

    fn claim(&self, transaction: &Transaction) -> Result<InFlightClaim<'_>, IngressError> {
        let capture_id = transaction.capture_id.clone();

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if !in_flight.insert(capture_id.clone()) {
                warn!(capture_id = %capture_id, "Concurrent submission rejected");
                return Err(IngressError::AlreadyInFlight(capture_id));
            }
        }

        let claim = InFlightClaim {
            set: &self.in_flight,
            capture_id,
        };

        if self.store.get_by_id(&claim.capture_id)?.is_some() {
            warn!(capture_id = %claim.capture_id, "Duplicate submission rejected");
            return Err(IngressError::AlreadyProcessed(claim.capture_id.clone()));
        }

        Ok(claim)
    }

    fn store_final(&self, mut record: TransactionRecord) -> Result<TransactionRecord, IngressError> {
        record.mark_processed(Utc::now());
        self.store.save(&record)?;
        info!(
            capture_id = %record.capture_id(),
            fulfillment = ?record.fulfillment_status(),
            store = self.store.backend_name(),
            "Transaction processed"
        );
        Ok(record)
    }
}

/// Releases the capture id when the submission finishes or is dropped.
struct InFlightClaim<'a> {
    set: &'a Mutex<HashSet<String>>,
    capture_id: String,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.capture_id);
    }
}
