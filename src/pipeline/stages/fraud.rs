//! Fraud detection stage

use async_trait::async_trait;

use super::{Stage, StageInterrupted};
use crate::judgment::{JudgmentError, JudgmentGate, JudgmentQuery};
use crate::pipeline::graph::StageId;
use crate::types::TransactionRecord;

pub const FRAUD_MESSAGE: &str = "Transaction flagged as potentially fraudulent.";
pub const UNAVAILABLE_MESSAGE: &str = "Fraud judgment unavailable.";

/// Sets `isFraudulent`. Only reached when validation said yes; the
/// precondition is the graph's job, not re-checked here.
#[derive(Debug, Clone, Copy, Default)]
pub struct FraudStage;

#[async_trait]
impl Stage for FraudStage {
    fn id(&self) -> StageId {
        StageId::FraudChecking
    }

    fn name(&self) -> &'static str {
        "Fraud Detection Agent"
    }

    async fn run(
        &self,
        record: &mut TransactionRecord,
        gate: &JudgmentGate,
    ) -> Result<(), StageInterrupted> {
        let outcome = gate
            .classify(&JudgmentQuery::Fraud {
                transaction: record.transaction(),
            })
            .await;

        match outcome {
            Ok(judgment) if judgment.is_yes() => {
                record.resolve_fraud(true);
                record.flag_error(FRAUD_MESSAGE);
                record.append_history(format!("{}: Transaction is fraudulent.", self.name()));
            }
            Ok(_) => {
                record.resolve_fraud(false);
                record.append_history(format!(
                    "{}: Transaction is not fraudulent.",
                    self.name()
                ));
            }
            Err(JudgmentError::Cancelled) => return Err(StageInterrupted),
            Err(e) => {
                record.flag_error(UNAVAILABLE_MESSAGE);
                record.append_history(format!(
                    "{}: fraud judgment unavailable ({e}).",
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
    use crate::pipeline::stages::validate;
    use crate::types::{Amount, Metadata, Transaction, TransactionStatus, Verdict};
    use std::sync::Arc;
    use std::time::Duration;

    fn valid_record() -> TransactionRecord {
        let mut record = TransactionRecord::new(Transaction {
            capture_id: "cap_fraud".to_string(),
            request_id: "req_fraud".to_string(),
            charge_id: "chg_fraud".to_string(),
            status: TransactionStatus::Success,
            amount: Amount {
                value: 50_000,
                currency: "SGD".to_string(),
            },
            metadata: Metadata::new(),
            created_at: "2025-06-30T20:53:06Z".to_string(),
            updated_at: "2025-06-30T20:53:06Z".to_string(),
        });
        record.resolve_validity(true);
        record.append_history("Validation Agent: Transaction is valid.");
        record
    }

    fn gate(judge: ScriptedJudge) -> JudgmentGate {
        JudgmentGate::new(
            Arc::new(judge) as Arc<dyn JudgmentPort>,
            GatePolicy {
                timeout: Duration::from_millis(50),
                max_attempts: 1,
            },
        )
    }

    #[tokio::test]
    async fn test_fraudulent_sets_error() {
        let mut record = valid_record();
        FraudStage
            .run(&mut record, &gate(ScriptedJudge::new().fraud("yes")))
            .await
            .unwrap();

        assert_eq!(record.is_fraudulent(), Verdict::Yes);
        assert_eq!(record.error_message(), Some(FRAUD_MESSAGE));
        assert_eq!(
            record.history().last(),
            Some("Fraud Detection Agent: Transaction is fraudulent.")
        );
    }

    #[tokio::test]
    async fn test_not_fraudulent() {
        let mut record = valid_record();
        FraudStage
            .run(&mut record, &gate(ScriptedJudge::new().fraud("NO")))
            .await
            .unwrap();

        assert_eq!(record.is_fraudulent(), Verdict::No);
        assert!(record.error_message().is_none());
        assert_eq!(record.history().len(), 2);
    }

    #[tokio::test]
    async fn test_fraud_flag_replaces_earlier_message() {
        let mut record = valid_record();
        record.flag_error(validate::UNAVAILABLE_MESSAGE);

        FraudStage
            .run(&mut record, &gate(ScriptedJudge::new().fraud("yes")))
            .await
            .unwrap();

        assert_eq!(record.error_message(), Some(FRAUD_MESSAGE));
    }

    #[tokio::test]
    async fn test_not_fraudulent_keeps_earlier_message() {
        let mut record = valid_record();
        record.flag_error(validate::UNAVAILABLE_MESSAGE);

        FraudStage
            .run(&mut record, &gate(ScriptedJudge::new().fraud("no")))
            .await
            .unwrap();

        assert_eq!(record.is_fraudulent(), Verdict::No);
        assert_eq!(record.error_message(), Some(validate::UNAVAILABLE_MESSAGE));
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let mut record = valid_record();
        let judge = ScriptedJudge::new().script(
            QueryKind::Fraud,
            Scripted::Fail(JudgmentError::Transport("connection refused".into())),
        );
        FraudStage.run(&mut record, &gate(judge)).await.unwrap();

        assert_eq!(record.is_fraudulent(), Verdict::Unknown);
        assert_eq!(record.error_message(), Some(UNAVAILABLE_MESSAGE));
        assert_eq!(record.history().len(), 2);
    }
}
