//! JudgmentGate - the single call site for oracle queries
//!
//! Every stage goes through the gate, which:
//! - bounds each attempt with `tokio::time::timeout`
//! - retries only timeouts and transport failures, up to `max_attempts`
//! - aborts promptly when its cancellation token fires
//! - parses oracle text into a closed [`Judgment`]

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{Judgment, JudgmentError, JudgmentPort, JudgmentQuery};
use crate::config::JudgmentConfig;

/// Per-call policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    /// Deadline for a single attempt
    pub timeout: Duration,
    /// Attempts per call (1 = no retry)
    pub max_attempts: u32,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 1,
        }
    }
}

impl From<&JudgmentConfig> for GatePolicy {
    fn from(cfg: &JudgmentConfig) -> Self {
        Self {
            timeout: Duration::from_millis(cfg.timeout_ms),
            max_attempts: cfg.max_attempts.max(1),
        }
    }
}

/// Cheap to clone: the port is shared behind an `Arc`.
#[derive(Clone)]
pub struct JudgmentGate {
    port: Arc<dyn JudgmentPort>,
    policy: GatePolicy,
    cancel: Option<CancellationToken>,
}

impl JudgmentGate {
    pub fn new(port: Arc<dyn JudgmentPort>, policy: GatePolicy) -> Self {
        Self {
            port,
            policy,
            cancel: None,
        }
    }

    /// Copy of this gate whose calls abort when `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            port: Arc::clone(&self.port),
            policy: self.policy,
            cancel: Some(token),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.port.backend_name()
    }

    pub fn policy(&self) -> GatePolicy {
        self.policy
    }

    /// Binary classification of the query.
    pub async fn classify(&self, query: &JudgmentQuery<'_>) -> Result<Judgment, JudgmentError> {
        let text = self.ask(query).await?;
        Judgment::parse(&text)
    }

    /// Free-text advisory answer. Blank text counts as malformed.
    pub async fn advise(&self, query: &JudgmentQuery<'_>) -> Result<String, JudgmentError> {
        let text = self.ask(query).await?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(JudgmentError::Malformed("empty summary".into()));
        }
        Ok(trimmed.to_string())
    }

    async fn ask(&self, query: &JudgmentQuery<'_>) -> Result<String, JudgmentError> {
        let kind = query.kind();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let started = Instant::now();
            match self.attempt(query).await {
                Ok(text) => {
                    debug!(
                        kind = %kind,
                        backend = self.port.backend_name(),
                        attempt,
                        latency_ms = started.elapsed().as_millis() as u64,
                        "Judgment received"
                    );
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    warn!(
                        kind = %kind,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %e,
                        "Judgment attempt failed, retrying"
                    );
                }
                Err(e) => {
                    warn!(kind = %kind, attempt, error = %e, "Judgment unavailable");
                    return Err(e);
                }
            }
        }
    }

    async fn attempt(&self, query: &JudgmentQuery<'_>) -> Result<String, JudgmentError> {
        let after_ms = self.policy.timeout.as_millis() as u64;
        let call = tokio::time::timeout(self.policy.timeout, self.port.answer(query));

        let outcome = match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return Err(JudgmentError::Cancelled),
                    outcome = call => outcome,
                }
            }
            None => call.await,
        };

        // Cancelled is reserved for this gate's own token.
        match outcome.map_err(|_| JudgmentError::Timeout { after_ms })? {
            Err(JudgmentError::Cancelled) => Err(JudgmentError::Backend(
                "backend reported cancellation".into(),
            )),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judgment::{QueryKind, Scripted, ScriptedJudge};
    use crate::types::{Amount, Metadata, Transaction, TransactionStatus};

    fn create_test_transaction() -> Transaction {
        Transaction {
            capture_id: "cap_gate".to_string(),
            request_id: "req_gate".to_string(),
            charge_id: "chg_gate".to_string(),
            status: TransactionStatus::Success,
            amount: Amount {
                value: 1000,
                currency: "SGD".to_string(),
            },
            metadata: Metadata::new(),
            created_at: "2025-06-30T20:53:06Z".to_string(),
            updated_at: "2025-06-30T20:53:06Z".to_string(),
        }
    }

    fn gate(judge: &Arc<ScriptedJudge>, timeout_ms: u64, max_attempts: u32) -> JudgmentGate {
        JudgmentGate::new(
            Arc::clone(judge) as Arc<dyn JudgmentPort>,
            GatePolicy {
                timeout: Duration::from_millis(timeout_ms),
                max_attempts,
            },
        )
    }

    #[tokio::test]
    async fn test_classify_parses_answer() {
        let judge = Arc::new(ScriptedJudge::new().validation(" Yes \n"));
        let tx = create_test_transaction();
        let result = gate(&judge, 1000, 1)
            .classify(&JudgmentQuery::Validation { transaction: &tx })
            .await;
        assert_eq!(result, Ok(Judgment::Yes));
    }

    #[tokio::test]
    async fn test_unparseable_answer_is_malformed_and_not_retried() {
        let judge = Arc::new(ScriptedJudge::new().validation("probably"));
        let tx = create_test_transaction();
        let result = gate(&judge, 1000, 3)
            .classify(&JudgmentQuery::Validation { transaction: &tx })
            .await;
        assert!(matches!(result, Err(JudgmentError::Malformed(_))));
        assert_eq!(judge.calls(QueryKind::Validation), 1);
    }

    #[tokio::test]
    async fn test_stalled_backend_times_out() {
        let judge = Arc::new(ScriptedJudge::new().script(QueryKind::Fraud, Scripted::Stall));
        let tx = create_test_transaction();
        let result = gate(&judge, 20, 1)
            .classify(&JudgmentQuery::Fraud { transaction: &tx })
            .await;
        assert_eq!(result, Err(JudgmentError::Timeout { after_ms: 20 }));
    }

    #[tokio::test]
    async fn test_transport_failures_retry_up_to_limit() {
        let judge = Arc::new(ScriptedJudge::new().script(
            QueryKind::Fraud,
            Scripted::Fail(JudgmentError::Transport("connection reset".into())),
        ));
        let tx = create_test_transaction();
        let result = gate(&judge, 1000, 3)
            .classify(&JudgmentQuery::Fraud { transaction: &tx })
            .await;
        assert!(matches!(result, Err(JudgmentError::Transport(_))));
        assert_eq!(judge.calls(QueryKind::Fraud), 3);
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_call() {
        let judge = Arc::new(ScriptedJudge::new().script(QueryKind::Fraud, Scripted::Stall));
        let tx = create_test_transaction();
        let token = CancellationToken::new();
        token.cancel();
        let result = gate(&judge, 60_000, 1)
            .with_cancellation(token)
            .classify(&JudgmentQuery::Fraud { transaction: &tx })
            .await;
        assert_eq!(result, Err(JudgmentError::Cancelled));
    }

    #[tokio::test]
    async fn test_backend_cancellation_is_unavailable_not_cancelled() {
        let judge = Arc::new(ScriptedJudge::new().script(
            QueryKind::Fraud,
            Scripted::Fail(JudgmentError::Cancelled),
        ));
        let tx = create_test_transaction();
        let result = gate(&judge, 1000, 1)
            .classify(&JudgmentQuery::Fraud { transaction: &tx })
            .await;
        assert!(matches!(result, Err(JudgmentError::Backend(_))));
        assert!(result.unwrap_err().is_unavailable());
    }

    #[tokio::test]
    async fn test_blank_summary_is_malformed() {
        let judge = Arc::new(ScriptedJudge::new().summary("   "));
        let result = gate(&judge, 1000, 1)
            .advise(&JudgmentQuery::RecoverySummary {
                validation_status: "Valid",
                fraud_status: "Not Fraudulent",
                fulfillment: crate::types::FulfillmentStatus::Success,
            })
            .await;
        assert!(matches!(result, Err(JudgmentError::Malformed(_))));
    }
}
