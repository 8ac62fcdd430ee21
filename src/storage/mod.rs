//! TransactionStore trait - pluggable persistence for final records
//!
//! The pipeline hands each completed record to the store exactly once.
//! Backends:
//! - `InMemoryStore`: tests and throwaway deployments, not durable
//! - `SledStore`: embedded sled database, one atomic write per record

mod memory;
mod sled_store;

pub use memory::InMemoryStore;
pub use sled_store::SledStore;

use std::sync::Arc;
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::types::TransactionRecord;

/// Maximum page size for [`TransactionStore::list`].
pub const MAX_LIST_LIMIT: usize = 1000;

/// Trait for pluggable persistence backends
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks.
pub trait TransactionStore: Send + Sync {
    /// Store a final record. A second record with the same capture id is
    /// rejected with [`PersistenceError::Conflict`].
    fn save(&self, record: &TransactionRecord) -> Result<(), PersistenceError>;

    /// Get a record by capture id
    fn get_by_id(&self, capture_id: &str) -> Result<Option<TransactionRecord>, PersistenceError>;

    /// Page of records, most recently saved first
    fn list(&self, offset: usize, limit: usize) -> Result<Vec<TransactionRecord>, PersistenceError>;

    /// Number of stored records
    fn count(&self) -> Result<usize, PersistenceError>;

    /// Flush pending writes to durable storage
    fn flush(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("record already stored: {0}")]
    Conflict(String),
}

impl From<sled::Error> for PersistenceError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Open the configured backend.
///
/// # Errors
///
/// Returns an error if the sled database cannot be opened.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn TransactionStore>, PersistenceError> {
    let store: Arc<dyn TransactionStore> = match config.backend {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Sled => Arc::new(SledStore::open(&config.path)?),
    };

    info!(
        backend = store.backend_name(),
        path = %config.path.display(),
        records = store.count().unwrap_or(0),
        "Transaction store ready"
    );
    Ok(store)
}
