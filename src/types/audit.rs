//! Append-only audit trail.

use serde::{Deserialize, Serialize};

/// Ordered log of human-readable stage outcomes.
///
/// There is no API to remove, reorder or rewrite entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditTrail(Vec<String>);

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: impl Into<String>) {
        self.0.push(entry.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a AuditTrail {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut trail = AuditTrail::new();
        trail.append("first");
        trail.append(String::from("second"));

        assert_eq!(trail.len(), 2);
        assert_eq!(trail.entries(), ["first", "second"]);
        assert_eq!(trail.last(), Some("second"));
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let mut trail = AuditTrail::new();
        trail.append("only");
        let json = serde_json::to_value(&trail).unwrap();
        assert_eq!(json, serde_json::json!(["only"]));
    }
}
