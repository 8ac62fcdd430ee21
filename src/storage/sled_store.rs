//! Sled-backed store
//!
//! Two trees:
//! - `records`: capture id -> JSON-serialized `TransactionRecord`
//! - `order`: sled-generated id (u64 big-endian, sorts by insertion) -> capture id
//!
//! Both are written in one multi-tree transaction, so a record is either
//! fully stored and listed or not stored at all.

use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{PersistenceError, TransactionStore};
use crate::types::TransactionRecord;

const RECORDS_TREE: &str = "records";
const ORDER_TREE: &str = "order";

/// Durable store on an embedded sled database
#[derive(Clone)]
pub struct SledStore {
    db: Arc<sled::Db>,
    records: sled::Tree,
    order: sled::Tree,
}

impl SledStore {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Throwaway database removed on drop
    pub fn temporary() -> Result<Self, PersistenceError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, PersistenceError> {
        let records = db.open_tree(RECORDS_TREE)?;
        let order = db.open_tree(ORDER_TREE)?;
        Ok(Self {
            db: Arc::new(db),
            records,
            order,
        })
    }

    fn decode(bytes: &[u8]) -> Result<TransactionRecord, PersistenceError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl TransactionStore for SledStore {
    fn save(&self, record: &TransactionRecord) -> Result<(), PersistenceError> {
        let key = record.capture_id().as_bytes();
        let value = serde_json::to_vec(record)?;
        let seq = self.db.generate_id()?.to_be_bytes();

        let result: Result<(), TransactionError<()>> =
            (&self.records, &self.order).transaction(|(records, order)| {
                if records.get(key)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(()));
                }
                records.insert(key, value.as_slice())?;
                order.insert(&seq[..], key)?;
                Ok(())
            });

        match result {
            Ok(()) => {
                debug!(capture_id = %record.capture_id(), "Record stored");
                Ok(())
            }
            Err(TransactionError::Abort(())) => {
                Err(PersistenceError::Conflict(record.capture_id().to_string()))
            }
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    fn get_by_id(&self, capture_id: &str) -> Result<Option<TransactionRecord>, PersistenceError> {
        self.records
            .get(capture_id.as_bytes())?
            .map(|bytes| Self::decode(&bytes))
            .transpose()
    }

    fn list(&self, offset: usize, limit: usize) -> Result<Vec<TransactionRecord>, PersistenceError> {
        let mut page = Vec::with_capacity(limit.min(super::MAX_LIST_LIMIT));

        for item in self.order.iter().rev().skip(offset).take(limit) {
            let (_seq, capture_id) = item?;
            match self.records.get(&capture_id)? {
                Some(bytes) => page.push(Self::decode(&bytes)?),
                None => warn!(
                    capture_id = %String::from_utf8_lossy(&capture_id),
                    "Order entry without a record, skipping"
                ),
            }
        }

        Ok(page)
    }

    fn count(&self) -> Result<usize, PersistenceError> {
        Ok(self.records.len())
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        self.db.flush()?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}
