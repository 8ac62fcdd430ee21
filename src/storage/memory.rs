//! In-memory store

use std::sync::RwLock;

use super::{PersistenceError, TransactionStore};
use crate::types::TransactionRecord;

/// In-memory persistence for testing and minimal deployments
///
/// Thread-safe via `RwLock`. Not durable: data lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<TransactionRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionStore for InMemoryStore {
    fn save(&self, record: &TransactionRecord) -> Result<(), PersistenceError> {
        let mut store = self
            .records
            .write()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        if store.iter().any(|r| r.capture_id() == record.capture_id()) {
            return Err(PersistenceError::Conflict(record.capture_id().to_string()));
        }

        store.push(record.clone());
        Ok(())
    }

    fn get_by_id(&self, capture_id: &str) -> Result<Option<TransactionRecord>, PersistenceError> {
        let store = self
            .records
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        Ok(store.iter().find(|r| r.capture_id() == capture_id).cloned())
    }

    fn list(&self, offset: usize, limit: usize) -> Result<Vec<TransactionRecord>, PersistenceError> {
        let store = self
            .records
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        Ok(store.iter().rev().skip(offset).take(limit).cloned().collect())
    }

    fn count(&self) -> Result<usize, PersistenceError> {
        let store = self
            .records
            .read()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        Ok(store.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amount, Metadata, Transaction, TransactionStatus};

    fn create_test_record(capture_id: &str) -> TransactionRecord {
        TransactionRecord::new(Transaction {
            capture_id: capture_id.to_string(),
            request_id: format!("req_{capture_id}"),
            charge_id: format!("chg_{capture_id}"),
            status: TransactionStatus::Success,
            amount: Amount {
                value: 1000,
                currency: "SGD".to_string(),
            },
            metadata: Metadata::new(),
            created_at: "2025-06-30T20:53:06Z".to_string(),
            updated_at: "2025-06-30T20:53:06Z".to_string(),
        })
    }

    #[test]
    fn test_save_and_get() {
        let store = InMemoryStore::new();
        store.save(&create_test_record("cap_1")).unwrap();

        let found = store.get_by_id("cap_1").unwrap();
        assert_eq!(found.map(|r| r.capture_id().to_string()), Some("cap_1".into()));
        assert!(store.get_by_id("cap_missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let store = InMemoryStore::new();
        store.save(&create_test_record("cap_1")).unwrap();
        let err = store.save(&create_test_record("cap_1")).unwrap_err();
        assert!(matches!(err, PersistenceError::Conflict(id) if id == "cap_1"));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_list_newest_first_with_paging() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store.save(&create_test_record(&format!("cap_{i}"))).unwrap();
        }

        let ids = |records: Vec<TransactionRecord>| {
            records
                .iter()
                .map(|r| r.capture_id().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(store.list(0, 2).unwrap()), vec!["cap_4", "cap_3"]);
        assert_eq!(ids(store.list(3, 10).unwrap()), vec!["cap_1", "cap_0"]);
        assert!(store.list(5, 10).unwrap().is_empty());
    }
}
