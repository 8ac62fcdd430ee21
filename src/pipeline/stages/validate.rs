//! Validation stage

use async_trait::async_trait;
use tracing::debug;

use super::{Stage, StageInterrupted};
use crate::judgment::{JudgmentError, JudgmentGate, JudgmentQuery};
use crate::pipeline::graph::StageId;
use crate::types::TransactionRecord;

pub const FAILURE_STATUS_MESSAGE: &str = "status is FAILURE";
pub const INVALID_MESSAGE: &str = "Transaction failed validation checks.";
pub const UNAVAILABLE_MESSAGE: &str = "Validation judgment unavailable.";

/// Sets `isValid`. The `FAILURE` sentinel short-circuits without an oracle call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateStage;

#[async_trait]
impl Stage for ValidateStage {
    fn id(&self) -> StageId {
        StageId::Validating
    }

    fn name(&self) -> &'static str {
        "Validation Agent"
    }

    async fn run(
        &self,
        record: &mut TransactionRecord,
        gate: &JudgmentGate,
    ) -> Result<(), StageInterrupted> {
        if record.transaction().status.is_failure_sentinel() {
            debug!(capture_id = %record.capture_id(), "FAILURE sentinel, skipping oracle");
            record.resolve_validity(false);
            record.flag_error(FAILURE_STATUS_MESSAGE);
            record.append_history(format!(
                "{}: Transaction status is FAILURE. Marking as invalid.",
                self.name()
            ));
            return Ok(());
        }

        let outcome = gate
            .classify(&JudgmentQuery::Validation {
                transaction: record.transaction(),
            })
            .await;

        match outcome {
            Ok(judgment) if judgment.is_yes() => {
                record.resolve_validity(true);
                record.append_history(format!("{}: Transaction is valid.", self.name()));
            }
            Ok(_) => {
                record.resolve_validity(false);
                record.flag_error(INVALID_MESSAGE);
                record.append_history(format!("{}: Transaction is invalid.", self.name()));
            }
            Err(JudgmentError::Cancelled) => return Err(StageInterrupted),
            Err(e) => {
                record.flag_error(UNAVAILABLE_MESSAGE);
                record.append_history(format!(
                    "{}: validation judgment unavailable ({e}).",
                    self.name()
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judgment::{GatePolicy, JudgmentPort, QueryKind, Scripted, ScriptedJudge};
    use crate::types::{Amount, Metadata, Transaction, TransactionStatus, Verdict};
    use std::sync::Arc;
    use std::time::Duration;

    fn record_with_status(status: &str) -> TransactionRecord {
        TransactionRecord::new(Transaction {
            capture_id: "cap_val".to_string(),
            request_id: "req_val".to_string(),
            charge_id: "chg_val".to_string(),
            status: TransactionStatus::from(status),
            amount: Amount {
                value: 1000,
                currency: "SGD".to_string(),
            },
            metadata: Metadata::new(),
            created_at: "2025-06-30T20:53:06Z".to_string(),
            updated_at: "2025-06-30T20:53:06Z".to_string(),
        })
    }

    fn gate(judge: &Arc<ScriptedJudge>) -> JudgmentGate {
        JudgmentGate::new(
            Arc::clone(judge) as Arc<dyn JudgmentPort>,
            GatePolicy {
                timeout: Duration::from_millis(50),
                max_attempts: 1,
            },
        )
    }

    #[tokio::test]
    async fn test_failure_sentinel_skips_oracle() {
        let judge = Arc::new(ScriptedJudge::new());
        let mut record = record_with_status("FAILURE");

        ValidateStage.run(&mut record, &gate(&judge)).await.unwrap();

        assert_eq!(record.is_valid(), Verdict::No);
        assert_eq!(record.error_message(), Some(FAILURE_STATUS_MESSAGE));
        assert_eq!(record.history().len(), 1);
        assert_eq!(judge.calls(QueryKind::Validation), 0);
    }

    #[tokio::test]
    async fn test_failed_status_is_not_the_sentinel() {
        let judge = Arc::new(ScriptedJudge::new().validation("no"));
        let mut record = record_with_status("FAILED");

        ValidateStage.run(&mut record, &gate(&judge)).await.unwrap();

        assert_eq!(judge.calls(QueryKind::Validation), 1);
        assert_eq!(record.is_valid(), Verdict::No);
        assert_eq!(record.error_message(), Some(INVALID_MESSAGE));
        assert_eq!(
            record.history().last(),
            Some("Validation Agent: Transaction is invalid.")
        );
    }

    #[tokio::test]
    async fn test_valid_answer() {
        let judge = Arc::new(ScriptedJudge::new().validation("Yes"));
        let mut record = record_with_status("SUCCESS");

        ValidateStage.run(&mut record, &gate(&judge)).await.unwrap();

        assert_eq!(record.is_valid(), Verdict::Yes);
        assert!(record.error_message().is_none());
        assert_eq!(
            record.history().last(),
            Some("Validation Agent: Transaction is valid.")
        );
    }

    #[tokio::test]
    async fn test_timeout_leaves_validity_unknown() {
        let judge = Arc::new(ScriptedJudge::new().script(QueryKind::Validation, Scripted::Stall));
        let mut record = record_with_status("SUCCESS");

        ValidateStage.run(&mut record, &gate(&judge)).await.unwrap();

        assert_eq!(record.is_valid(), Verdict::Unknown);
        assert_eq!(record.error_message(), Some(UNAVAILABLE_MESSAGE));
        assert_eq!(record.history().len(), 1);
        assert!(record
            .history()
            .last()
            .is_some_and(|entry| entry.contains("unavailable")));
    }

    #[tokio::test]
    async fn test_malformed_answer_is_unavailable() {
        let judge = Arc::new(ScriptedJudge::new().validation("it depends"));
        let mut record = record_with_status("SUCCESS");

        ValidateStage.run(&mut record, &gate(&judge)).await.unwrap();

        assert_eq!(record.is_valid(), Verdict::Unknown);
        assert_eq!(record.error_message(), Some(UNAVAILABLE_MESSAGE));
    }
}
