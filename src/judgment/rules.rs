//! Rule-based judge
//!
//! Deterministic stand-in for an external oracle. Applies the validation
//! rubric literally and flags fraud on an amount threshold or suspicious
//! metadata, answering in the same "yes"/"no" vocabulary a text oracle uses.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use regex::Regex;
use tracing::debug;

use super::{JudgmentError, JudgmentPort, JudgmentQuery};
use crate::config::RulesConfig;
use crate::types::{FulfillmentStatus, Transaction};

/// Deterministic judge driven by [`RulesConfig`].
#[derive(Debug, Clone)]
pub struct RuleBasedJudge {
    fraud_amount_threshold: u64,
    suspicious: Vec<Regex>,
    allowed_statuses: Vec<String>,
}

impl RuleBasedJudge {
    /// # Errors
    ///
    /// Returns an error if a suspicious-metadata pattern does not compile.
    pub fn new(rules: &RulesConfig) -> Result<Self, regex::Error> {
        let suspicious = rules
            .suspicious_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            fraud_amount_threshold: rules.fraud_amount_threshold,
            suspicious,
            allowed_statuses: rules.allowed_statuses.clone(),
        })
    }

    /// Rubric violations; empty means valid.
    pub fn validation_findings(&self, tx: &Transaction) -> Vec<String> {
        let mut findings = Vec::new();

        for (field, value) in [
            ("captureId", &tx.capture_id),
            ("requestId", &tx.request_id),
            ("chargeId", &tx.charge_id),
        ] {
            if value.trim().is_empty() {
                findings.push(format!("{field} is empty"));
            }
        }

        if !self.allowed_statuses.iter().any(|s| s == tx.status.as_str()) {
            findings.push(format!("status '{}' not allowed", tx.status));
        }

        if tx.amount.value == 0 {
            findings.push("amount.value must be positive".to_string());
        }

        if !is_currency_code(&tx.amount.currency) {
            findings.push(format!(
                "amount.currency '{}' is not a 3-letter code",
                tx.amount.currency
            ));
        }

        for (field, value) in [("createdAt", &tx.created_at), ("updatedAt", &tx.updated_at)] {
            if !is_iso8601(value) {
                findings.push(format!("{field} '{value}' is not ISO-8601"));
            }
        }

        findings
    }

    /// Fraud indicators; empty means not fraudulent.
    pub fn fraud_signals(&self, tx: &Transaction) -> Vec<String> {
        let mut signals = Vec::new();

        if tx.amount.value >= self.fraud_amount_threshold {
            signals.push(format!(
                "amount {} >= threshold {}",
                tx.amount.value, self.fraud_amount_threshold
            ));
        }

        for (key, value) in &tx.metadata {
            let Some(text) = value.as_str() else { continue };
            if let Some(re) = self.suspicious.iter().find(|re| re.is_match(text)) {
                signals.push(format!("metadata.{key} matches /{}/", re.as_str()));
            }
        }

        signals
    }

    fn summary(validation_status: &str, fraud_status: &str, fulfillment: FulfillmentStatus) -> String {
        let action = match fulfillment {
            FulfillmentStatus::Success => "Fulfillment processed; no further action required.",
            FulfillmentStatus::FlaggedForReview => {
                "Fulfillment withheld; transaction queued for manual review."
            }
        };
        format!("Validation: {validation_status}. Fraud check: {fraud_status}. {action}")
    }
}

fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// RFC 3339 with offset, or a local date-time without one.
fn is_iso8601(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

#[async_trait]
impl JudgmentPort for RuleBasedJudge {
    async fn answer(&self, query: &JudgmentQuery<'_>) -> Result<String, JudgmentError> {
        match query {
            JudgmentQuery::Validation { transaction } => {
                let findings = self.validation_findings(transaction);
                debug!(
                    capture_id = %transaction.capture_id,
                    findings = ?findings,
                    "Rule-based validation"
                );
                Ok(yes_no(findings.is_empty()))
            }
            JudgmentQuery::Fraud { transaction } => {
                let signals = self.fraud_signals(transaction);
                debug!(
                    capture_id = %transaction.capture_id,
                    signals = ?signals,
                    "Rule-based fraud check"
                );
                Ok(yes_no(!signals.is_empty()))
            }
            JudgmentQuery::RecoverySummary {
                validation_status,
                fraud_status,
                fulfillment,
            } => Ok(Self::summary(validation_status, fraud_status, *fulfillment)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "rules"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amount, Metadata, TransactionStatus};

    fn create_test_transaction(status: &str, value: u64) -> Transaction {
        Transaction {
            capture_id: "cap_rules".to_string(),
            request_id: "req_rules".to_string(),
            charge_id: "chg_rules".to_string(),
            status: TransactionStatus::from(status),
            amount: Amount {
                value,
                currency: "SGD".to_string(),
            },
            metadata: Metadata::new(),
            created_at: "2025-06-30T20:53:06+05:30".to_string(),
            updated_at: "2025-06-30T20:53:06+05:30".to_string(),
        }
    }

    fn judge() -> RuleBasedJudge {
        RuleBasedJudge::new(&RulesConfig::default()).unwrap()
    }

    #[test]
    fn test_clean_transaction_has_no_findings() {
        let tx = create_test_transaction("SUCCESS", 1000);
        assert!(judge().validation_findings(&tx).is_empty());
        assert!(judge().fraud_signals(&tx).is_empty());
    }

    #[test]
    fn test_validation_rubric_violations() {
        let mut tx = create_test_transaction("REFUNDED", 0);
        tx.amount.currency = "sgd".to_string();
        tx.created_at = "30/06/2025".to_string();
        tx.charge_id = "  ".to_string();

        let findings = judge().validation_findings(&tx);
        assert_eq!(findings.len(), 5, "{findings:?}");
    }

    #[test]
    fn test_naive_timestamp_accepted() {
        let mut tx = create_test_transaction("PENDING", 1);
        tx.created_at = "2025-06-30T20:53:06".to_string();
        tx.updated_at = "2025-06-30T20:53:06.123".to_string();
        assert!(judge().validation_findings(&tx).is_empty());
    }

    #[test]
    fn test_amount_threshold_flags_fraud() {
        let tx = create_test_transaction("SUCCESS", 10_000);
        assert_eq!(judge().fraud_signals(&tx).len(), 1);
        let tx = create_test_transaction("SUCCESS", 9_999);
        assert!(judge().fraud_signals(&tx).is_empty());
    }

    #[test]
    fn test_suspicious_metadata_flags_fraud() {
        let mut tx = create_test_transaction("SUCCESS", 500);
        tx.metadata.insert(
            "device_id".to_string(),
            serde_json::json!("Suspicious_device_123"),
        );
        tx.metadata.insert("attempts".to_string(), serde_json::json!(3));

        let signals = judge().fraud_signals(&tx);
        assert_eq!(signals.len(), 1);
        assert!(signals[0].contains("device_id"));
    }

    #[tokio::test]
    async fn test_answers_use_yes_no_vocabulary() {
        let judge = judge();
        let mut tx = create_test_transaction("SUCCESS", 50_000);
        tx.metadata.insert(
            "device_id".to_string(),
            serde_json::json!("suspicious_device_123"),
        );

        let valid = judge
            .answer(&JudgmentQuery::Validation { transaction: &tx })
            .await
            .unwrap();
        let fraud = judge
            .answer(&JudgmentQuery::Fraud { transaction: &tx })
            .await
            .unwrap();
        assert_eq!(valid, "yes");
        assert_eq!(fraud, "yes");
    }

    #[tokio::test]
    async fn test_summary_mentions_disposition() {
        let summary = judge()
            .answer(&JudgmentQuery::RecoverySummary {
                validation_status: "Invalid",
                fraud_status: "Unknown",
                fulfillment: FulfillmentStatus::FlaggedForReview,
            })
            .await
            .unwrap();
        assert!(summary.contains("manual review"));
        assert!(summary.contains("Invalid"));
    }
}
