//! Pipeline stages
//!
//! Each stage consults the [`JudgmentGate`] at most once and appends exactly
//! one history entry. All record mutation happens after the last await, so a
//! stage dropped or cancelled mid-call leaves the record untouched.
//!
//! 1. **Validate** - fast path on the `FAILURE` sentinel, otherwise rubric check
//! 2. **DetectFraud** - binary fraud classification
//! 3. **Recover** - fulfillment disposition plus advisory summary

pub mod fraud;
pub mod recover;
pub mod validate;

pub use fraud::FraudStage;
pub use recover::RecoverStage;
pub use validate::ValidateStage;

use async_trait::async_trait;

use super::graph::StageId;
use crate::judgment::JudgmentGate;
use crate::types::TransactionRecord;

/// The stage was cancelled while waiting on the oracle; nothing was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stage interrupted by cancellation")]
pub struct StageInterrupted;

/// Trait for pipeline stages
///
/// Unavailable judgments are absorbed into the record; the only error is
/// cancellation.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Graph state this stage runs in
    fn id(&self) -> StageId;

    /// Agent name used as the history prefix
    fn name(&self) -> &'static str;

    /// Run against the record, appending one history entry.
    async fn run(
        &self,
        record: &mut TransactionRecord,
        gate: &JudgmentGate,
    ) -> Result<(), StageInterrupted>;
}
