//! Recovery stage: fulfillment disposition and advisory summary
//!
//! The disposition is a pure function of `(isValid, isFraudulent)`. The
//! oracle only contributes summary text for the history entry.

use async_trait::async_trait;

use super::{Stage, StageInterrupted};
use crate::judgment::{JudgmentError, JudgmentGate, JudgmentQuery};
use crate::pipeline::graph::StageId;
use crate::types::{FulfillmentStatus, TransactionRecord, Verdict};

/// `SUCCESS` only for a definite valid, definite not-fraudulent record.
pub fn disposition(is_valid: Verdict, is_fraudulent: Verdict) -> FulfillmentStatus {
    match (is_valid, is_fraudulent) {
        (Verdict::Yes, Verdict::No) => FulfillmentStatus::Success,
        _ => FulfillmentStatus::FlaggedForReview,
    }
}

pub fn validation_label(is_valid: Verdict) -> &'static str {
    match is_valid {
        Verdict::Yes => "Valid",
        Verdict::No => "Invalid",
        Verdict::Unknown => "Unknown",
    }
}

pub fn fraud_label(is_fraudulent: Verdict) -> &'static str {
    match is_fraudulent {
        Verdict::Yes => "Fraudulent",
        Verdict::No => "Not Fraudulent",
        Verdict::Unknown => "Unknown",
    }
}

/// Terminal stage. Always runs, always writes `fulfillmentStatus`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoverStage;

#[async_trait]
impl Stage for RecoverStage {
    fn id(&self) -> StageId {
        StageId::Recovering
    }

    fn name(&self) -> &'static str {
        "Recovery Agent"
    }

    async fn run(
        &self,
        record: &mut TransactionRecord,
        gate: &JudgmentGate,
    ) -> Result<(), StageInterrupted> {
        let status = disposition(record.is_valid(), record.is_fraudulent());

        let summary = gate
            .advise(&JudgmentQuery::RecoverySummary {
                validation_status: validation_label(record.is_valid()),
                fraud_status: fraud_label(record.is_fraudulent()),
                fulfillment: status,
            })
            .await;

        let entry = match summary {
            Ok(text) => format!("{}: {text}", self.name()),
            Err(JudgmentError::Cancelled) => return Err(StageInterrupted),
            Err(e) => format!("{}: {status} (summary unavailable: {e}).", self.name()),
        };

        record.finalize(status);
        record.append_history(entry);
        Ok(())
    }
}
