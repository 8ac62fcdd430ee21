//! The record threaded through the pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use super::{AuditTrail, Transaction};

// ============================================================================
// Verdict
// ============================================================================

/// Three-valued stage outcome.
///
/// `Unknown` means "not evaluated" (or the judgment was unavailable) and is
/// never treated as `No`. On the wire it is `null` / `true` / `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Verdict {
    #[default]
    Unknown,
    Yes,
    No,
}

impl Verdict {
    pub fn is_yes(self) -> bool {
        self == Self::Yes
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Yes => Some(true),
            Self::No => Some(false),
        }
    }
}

impl From<bool> for Verdict {
    fn from(b: bool) -> Self {
        if b {
            Self::Yes
        } else {
            Self::No
        }
    }
}

impl From<Option<bool>> for Verdict {
    fn from(b: Option<bool>) -> Self {
        b.map_or(Self::Unknown, Self::from)
    }
}

impl From<Verdict> for Option<bool> {
    fn from(v: Verdict) -> Self {
        v.as_bool()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Yes => write!(f, "yes"),
            Self::No => write!(f, "no"),
        }
    }
}

// ============================================================================
// Fulfillment
// ============================================================================

/// Terminal disposition written by the recovery stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    Success,
    FlaggedForReview,
}

impl FulfillmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::FlaggedForReview => "FLAGGED_FOR_REVIEW",
        }
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TransactionRecord
// ============================================================================

/// Transaction plus everything the pipeline concluded about it.
///
/// Fields are private: the identity is read-only, outcomes can only move
/// from `Unknown` to a definite value, the fulfillment status is written
/// once, and history only grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    transaction: Transaction,
    is_valid: Verdict,
    is_fraudulent: Verdict,
    fulfillment_status: Option<FulfillmentStatus>,
    error_message: Option<String>,
    history: AuditTrail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    processed_at: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    /// Fresh record: all outcomes unknown, empty history.
    pub fn new(transaction: Transaction) -> Self {
        Self {
            transaction,
            is_valid: Verdict::Unknown,
            is_fraudulent: Verdict::Unknown,
            fulfillment_status: None,
            error_message: None,
            history: AuditTrail::new(),
            processed_at: None,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn capture_id(&self) -> &str {
        &self.transaction.capture_id
    }

    pub fn is_valid(&self) -> Verdict {
        self.is_valid
    }

    pub fn is_fraudulent(&self) -> Verdict {
        self.is_fraudulent
    }

    pub fn fulfillment_status(&self) -> Option<FulfillmentStatus> {
        self.fulfillment_status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn history(&self) -> &AuditTrail {
        &self.history
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    /// Recovery has run; the record no longer changes.
    pub fn is_final(&self) -> bool {
        self.fulfillment_status.is_some()
    }

    /// Record the validation outcome. A definite outcome is never replaced.
    pub fn resolve_validity(&mut self, valid: bool) {
        Self::resolve(&mut self.is_valid, valid, "is_valid", &self.transaction.capture_id);
    }

    /// Record the fraud outcome. A definite outcome is never replaced.
    pub fn resolve_fraud(&mut self, fraudulent: bool) {
        Self::resolve(
            &mut self.is_fraudulent,
            fraudulent,
            "is_fraudulent",
            &self.transaction.capture_id,
        );
    }

    fn resolve(slot: &mut Verdict, value: bool, field: &str, capture_id: &str) {
        if slot.is_known() {
            warn!(
                capture_id = %capture_id,
                field = field,
                kept = %slot,
                "Outcome already resolved, ignoring second write"
            );
            return;
        }
        *slot = Verdict::from(value);
    }

    /// Record a negative conclusion. A later conclusion replaces the message;
    /// there is no way to clear it.
    pub fn flag_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn append_history(&mut self, entry: impl Into<String>) {
        self.history.append(entry);
    }

    /// Write the terminal disposition. Only the first call has any effect.
    pub fn finalize(&mut self, status: FulfillmentStatus) {
        if let Some(existing) = self.fulfillment_status {
            warn!(
                capture_id = %self.transaction.capture_id,
                existing = %existing,
                attempted = %status,
                "Fulfillment status already set, ignoring"
            );
            return;
        }
        self.fulfillment_status = Some(status);
    }

    /// Stamp completion time (set by the ingress after the run).
    pub fn mark_processed(&mut self, at: DateTime<Utc>) {
        if self.processed_at.is_none() {
            self.processed_at = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amount, Metadata, TransactionStatus};

    fn sample_transaction(status: &str, value: u64) -> Transaction {
        Transaction {
            capture_id: "cap_1".to_string(),
            request_id: "req_1".to_string(),
            charge_id: "chg_1".to_string(),
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

    #[test]
    fn test_new_record_is_blank() {
        let record = TransactionRecord::new(sample_transaction("SUCCESS", 1000));
        assert_eq!(record.is_valid(), Verdict::Unknown);
        assert_eq!(record.is_fraudulent(), Verdict::Unknown);
        assert!(record.fulfillment_status().is_none());
        assert!(record.error_message().is_none());
        assert!(record.history().is_empty());
        assert!(!record.is_final());
    }

    #[test]
    fn test_resolved_verdict_is_not_overwritten() {
        let mut record = TransactionRecord::new(sample_transaction("SUCCESS", 1000));
        record.resolve_validity(true);
        record.resolve_validity(false);
        assert_eq!(record.is_valid(), Verdict::Yes);
    }

    #[test]
    fn test_finalize_only_once() {
        let mut record = TransactionRecord::new(sample_transaction("SUCCESS", 1000));
        record.finalize(FulfillmentStatus::FlaggedForReview);
        record.finalize(FulfillmentStatus::Success);
        assert_eq!(
            record.fulfillment_status(),
            Some(FulfillmentStatus::FlaggedForReview)
        );
        assert!(record.is_final());
    }

    #[test]
    fn test_wire_shape() {
        let mut record = TransactionRecord::new(sample_transaction("SUCCESS", 1000));
        record.resolve_validity(true);
        record.append_history("Validation Agent: Transaction is valid.");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["isValid"], serde_json::json!(true));
        assert_eq!(json["isFraudulent"], serde_json::Value::Null);
        assert_eq!(json["fulfillmentStatus"], serde_json::Value::Null);
        assert_eq!(json["transaction"]["captureId"], "cap_1");
        assert_eq!(json["history"].as_array().map(Vec::len), Some(1));
        assert!(json.get("processedAt").is_none());

        let back: TransactionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_fulfillment_status_wire_names() {
        assert_eq!(
            serde_json::to_value(FulfillmentStatus::FlaggedForReview).unwrap(),
            "FLAGGED_FOR_REVIEW"
        );
        assert_eq!(
            serde_json::to_value(FulfillmentStatus::Success).unwrap(),
            "SUCCESS"
        );
    }
}
