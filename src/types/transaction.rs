//! Transaction payload as submitted at ingress.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Arbitrary key → JSON value mapping attached to a transaction.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Monetary amount in minor units (e.g. cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: u64,
    pub currency: String,
}

/// Processor-reported status of the transaction.
///
/// Unrecognised strings are kept verbatim so the validation stage can judge
/// them instead of the payload being rejected at ingress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    /// Sentinel failure value; short-circuits validation.
    Failure,
    Other(String),
}

impl TransactionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Failure => "FAILURE",
            Self::Other(s) => s,
        }
    }

    /// True for the `FAILURE` sentinel only (not `FAILED`).
    pub fn is_failure_sentinel(&self) -> bool {
        matches!(self, Self::Failure)
    }
}

impl From<String> for TransactionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => Self::Pending,
            "SUCCESS" => Self::Success,
            "FAILED" => Self::Failed,
            "FAILURE" => Self::Failure,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for TransactionStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<TransactionStatus> for String {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transaction payload. Field names on the wire are camelCase.
///
/// Timestamps are kept as submitted; whether they are well-formed ISO-8601
/// is a validation judgment, not an ingress concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub capture_id: String,
    pub request_id: String,
    pub charge_id: String,
    pub status: TransactionStatus,
    pub amount: Amount,
    pub metadata: Metadata,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_string() {
        for raw in ["PENDING", "SUCCESS", "FAILED", "FAILURE", "REFUNDED"] {
            let status = TransactionStatus::from(raw);
            assert_eq!(status.as_str(), raw);
            assert_eq!(String::from(status), raw);
        }
    }

    #[test]
    fn test_only_failure_is_sentinel() {
        assert!(TransactionStatus::Failure.is_failure_sentinel());
        assert!(!TransactionStatus::Failed.is_failure_sentinel());
        assert!(!TransactionStatus::from("failure").is_failure_sentinel());
    }

    #[test]
    fn test_deserialize_camel_case_payload() {
        let json = serde_json::json!({
            "captureId": "cap_1",
            "requestId": "req_1",
            "chargeId": "chg_1",
            "status": "SUCCESS",
            "amount": {"value": 1000, "currency": "SGD"},
            "metadata": {"fulfillmentId": "fulfill_1"},
            "createdAt": "2025-06-30T20:53:06+05:30",
            "updatedAt": "2025-06-30T20:53:06+05:30"
        });

        let tx: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(tx.capture_id, "cap_1");
        assert_eq!(tx.status, TransactionStatus::Success);
        assert_eq!(tx.amount.value, 1000);
        assert_eq!(tx.metadata["fulfillmentId"], "fulfill_1");
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let json = serde_json::json!({
            "captureId": "cap_1",
            "requestId": "req_1",
            "chargeId": "chg_1",
            "status": "SUCCESS",
            "amount": {"value": -5, "currency": "SGD"},
            "metadata": {},
            "createdAt": "2025-06-30T20:53:06Z",
            "updatedAt": "2025-06-30T20:53:06Z"
        });

        assert!(serde_json::from_value::<Transaction>(json).is_err());
    }
}
