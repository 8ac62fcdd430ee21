//! Structural payload checks run before a record enters the pipeline.
//!
//! Only presence and JSON type are checked here. Content (allowed statuses,
//! currency codes, timestamp format, empty ids) is the validation stage's
//! call, so such payloads still produce a final record.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::Transaction;

const STRING_FIELDS: [&str; 6] = [
    "captureId",
    "requestId",
    "chargeId",
    "status",
    "createdAt",
    "updatedAt",
];

/// One structural problem with a submitted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a raw payload and build the transaction.
///
/// # Errors
///
/// Returns every structural problem found, not just the first.
pub fn parse_payload(payload: &Value) -> Result<Transaction, Vec<FieldIssue>> {
    let Some(object) = payload.as_object() else {
        return Err(vec![FieldIssue::new("$", "expected a JSON object")]);
    };

    let mut issues = Vec::new();

    for field in STRING_FIELDS {
        require(object, field, &mut issues, Value::is_string, "must be a string");
    }

    match object.get("amount") {
        None | Some(Value::Null) => issues.push(FieldIssue::new("amount", "is required")),
        Some(Value::Object(amount)) => {
            match amount.get("value") {
                None | Some(Value::Null) => {
                    issues.push(FieldIssue::new("amount.value", "is required"));
                }
                Some(v) if v.as_u64().is_none() => issues.push(FieldIssue::new(
                    "amount.value",
                    "must be a non-negative integer",
                )),
                Some(_) => {}
            }
            match amount.get("currency") {
                None | Some(Value::Null) => {
                    issues.push(FieldIssue::new("amount.currency", "is required"));
                }
                Some(v) if !v.is_string() => {
                    issues.push(FieldIssue::new("amount.currency", "must be a string"));
                }
                Some(_) => {}
            }
        }
        Some(_) => issues.push(FieldIssue::new("amount", "must be an object")),
    }

    require(object, "metadata", &mut issues, Value::is_object, "must be an object");

    if !issues.is_empty() {
        return Err(issues);
    }

    serde_json::from_value(payload.clone()).map_err(|e| vec![FieldIssue::new("$", e.to_string())])
}

fn require(
    object: &Map<String, Value>,
    field: &str,
    issues: &mut Vec<FieldIssue>,
    check: fn(&Value) -> bool,
    message: &str,
) {
    match object.get(field) {
        None | Some(Value::Null) => issues.push(FieldIssue::new(field, "is required")),
        Some(v) if !check(v) => issues.push(FieldIssue::new(field, message)),
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionStatus;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "captureId": "cap_intake",
            "requestId": "req_intake",
            "chargeId": "chg_intake",
            "status": "SUCCESS",
            "amount": {"value": 1000, "currency": "SGD"},
            "metadata": {"ip_address": "192.168.1.1"},
            "createdAt": "2025-06-30T20:53:06+05:30",
            "updatedAt": "2025-06-30T20:53:06+05:30"
        })
    }

    #[test]
    fn test_well_formed_payload() {
        let tx = parse_payload(&payload()).unwrap();
        assert_eq!(tx.capture_id, "cap_intake");
        assert_eq!(tx.status, TransactionStatus::Success);
        assert_eq!(tx.amount.value, 1000);
        assert_eq!(tx.metadata["ip_address"], "192.168.1.1");
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut p = payload();
        p.as_object_mut().unwrap().remove("chargeId");
        let issues = parse_payload(&p).unwrap_err();
        assert_eq!(issues, vec![FieldIssue::new("chargeId", "is required")]);
    }

    #[test]
    fn test_wrong_types_all_reported() {
        let mut p = payload();
        p["amount"]["value"] = json!("1000");
        p["amount"]["currency"] = json!(702);
        p["metadata"] = json!([]);
        let fields: Vec<String> = parse_payload(&p)
            .unwrap_err()
            .into_iter()
            .map(|i| i.field)
            .collect();
        assert_eq!(fields, vec!["amount.value", "amount.currency", "metadata"]);
    }

    #[test]
    fn test_negative_and_fractional_amounts_rejected() {
        for bad in [json!(-5), json!(10.5)] {
            let mut p = payload();
            p["amount"]["value"] = bad;
            assert!(parse_payload(&p).is_err());
        }
    }

    #[test]
    fn test_content_problems_pass_intake() {
        let mut p = payload();
        p["status"] = json!("REFUNDED");
        p["captureId"] = json!("");
        p["createdAt"] = json!("yesterday");
        assert!(parse_payload(&p).is_ok());
    }

    #[test]
    fn test_non_object_payload() {
        let issues = parse_payload(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(issues[0].field, "$");
    }
}
