//! Orchestrator - drives a record through the stage graph
//!
//! One run threads one record from the entry stage to `Done`. The
//! orchestrator owns the graph and the gate, both read-only, so a single
//! `Arc<Orchestrator>` serves any number of concurrent runs.
//!
//! ## Guarantees
//!
//! - each stage runs at most once per run; there are no orchestrator retries
//! - Recover always runs, whatever the earlier stages concluded
//! - each executed stage appends exactly one history entry
//! - with a cancellation token, cancellation lands on a stage boundary

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::graph::{PipelineGraph, StageId, Step};
use crate::judgment::JudgmentGate;
use crate::types::TransactionRecord;

// ============================================================================
// Run result
// ============================================================================

/// Final record plus the stages that ran, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunTrace {
    pub record: TransactionRecord,
    pub path: Vec<StageId>,
}

impl RunTrace {
    pub fn visited(&self, stage: StageId) -> bool {
        self.path.contains(&stage)
    }
}

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Cancelled before `stage` committed; `partial` holds the record as the
    /// previous stage left it.
    #[error("pipeline cancelled at {stage}")]
    Cancelled {
        stage: StageId,
        partial: Box<RunTrace>,
    },
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct Orchestrator {
    graph: PipelineGraph,
    gate: JudgmentGate,
    runs_completed: AtomicU64,
}

impl Orchestrator {
    pub fn new(graph: PipelineGraph, gate: JudgmentGate) -> Self {
        info!(
            backend = gate.backend_name(),
            timeout_ms = gate.policy().timeout.as_millis() as u64,
            max_attempts = gate.policy().max_attempts,
            "Orchestrator ready"
        );
        Self {
            graph,
            gate,
            runs_completed: 0.into(),
        }
    }

    /// Orchestrator over the standard stage graph.
    pub fn standard(gate: JudgmentGate) -> Self {
        Self::new(PipelineGraph::standard(), gate)
    }

    pub fn gate(&self) -> &JudgmentGate {
        &self.gate
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }

    /// Run the record to completion and return the final record.
    pub async fn execute(&self, record: TransactionRecord) -> TransactionRecord {
        self.execute_traced(record).await.record
    }

    /// Like [`execute`](Self::execute), also reporting the stages visited.
    pub async fn execute_traced(&self, record: TransactionRecord) -> RunTrace {
        match self.drive(record, &self.gate, None).await {
            Ok(trace) => trace,
            Err(PipelineError::Cancelled { stage, partial }) => {
                // Stages only report cancellation through a token-bearing gate.
                error!(stage = %stage, "Uncancellable run reported cancellation");
                *partial
            }
        }
    }

    /// Run with cooperative cancellation.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Cancelled` if `token` fires before Recover
    /// commits.
    pub async fn execute_with_cancel(
        &self,
        record: TransactionRecord,
        token: &CancellationToken,
    ) -> Result<RunTrace, PipelineError> {
        let gate = self.gate.with_cancellation(token.clone());
        self.drive(record, &gate, Some(token)).await
    }

    async fn drive(
        &self,
        mut record: TransactionRecord,
        gate: &JudgmentGate,
        token: Option<&CancellationToken>,
    ) -> Result<RunTrace, PipelineError> {
        let started = Instant::now();
        let mut path = Vec::with_capacity(3);
        let mut step = Step::Stage(self.graph.entry());

        while let Step::Stage(id) = step {
            if token.is_some_and(CancellationToken::is_cancelled) {
                return Err(cancelled(id, record, path));
            }

            let node = self.graph.node(id);
            let before = record.history().len();

            if node.stage.run(&mut record, gate).await.is_err() {
                return Err(cancelled(id, record, path));
            }
            path.push(id);

            let appended = record.history().len() - before;
            if appended != 1 {
                warn!(
                    capture_id = %record.capture_id(),
                    stage = %id,
                    appended,
                    "Stage did not append exactly one history entry"
                );
            }

            step = self.graph.next(id, &record);
            debug!(
                capture_id = %record.capture_id(),
                from = %id,
                to = ?step,
                is_valid = %record.is_valid(),
                is_fraudulent = %record.is_fraudulent(),
                "Stage transition"
            );
        }

        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        info!(
            capture_id = %record.capture_id(),
            path = ?path,
            is_valid = %record.is_valid(),
            is_fraudulent = %record.is_fraudulent(),
            fulfillment = ?record.fulfillment_status(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Pipeline run complete"
        );

        Ok(RunTrace { record, path })
    }
}

fn cancelled(stage: StageId, record: TransactionRecord, path: Vec<StageId>) -> PipelineError {
    warn!(capture_id = %record.capture_id(), stage = %stage, "Pipeline run cancelled");
    PipelineError::Cancelled {
        stage,
        partial: Box::new(RunTrace { record, path }),
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backend", &self.gate.backend_name())
            .field("runs_completed", &self.runs_completed())
            .finish()
    }
}
