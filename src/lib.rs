//! txn-guardian: Transaction validation, fraud assessment and fulfillment
//!
//! Staged pipeline for payment transaction records.
//!
//! ## Architecture
//!
//! - **Types**: `Transaction`, the shared `TransactionRecord`, three-valued `Verdict`
//! - **Judgment**: `JudgmentPort` backends behind a `JudgmentGate` (timeout, retry, parsing)
//! - **Pipeline**: stage graph, orchestrator, ingress processor
//! - **Storage**: `TransactionStore` with in-memory and sled backends
//! - **API**: axum HTTP ingress

pub mod api;
pub mod config;
pub mod judgment;
pub mod pipeline;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::ServiceConfig;

// Re-export commonly used types
pub use types::{
    Amount, AuditTrail, FulfillmentStatus, Metadata, Transaction, TransactionRecord,
    TransactionStatus, Verdict,
};

// Re-export judgment components
pub use judgment::{
    GatePolicy, Judgment, JudgeFactory, JudgmentError, JudgmentGate, JudgmentPort,
    JudgmentQuery, RuleBasedJudge,
};

// Re-export pipeline components
pub use pipeline::{
    IngressError, Orchestrator, PipelineError, PipelineGraph, RunTrace, StageId,
    TransactionProcessor,
};

// Re-export storage
pub use storage::{open_store, InMemoryStore, PersistenceError, SledStore, TransactionStore};
