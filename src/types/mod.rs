//! Shared data structures for the transaction processing pipeline
//!
//! - `Transaction`: the ingress payload (identity, status, amount, metadata, timestamps)
//! - `TransactionRecord`: the record threaded through the stages
//! - `Verdict`: three-valued stage outcome (unknown / yes / no)
//! - `AuditTrail`: append-only history embedded in the record

mod audit;
mod record;
mod transaction;

pub use audit::*;
pub use record::*;
pub use transaction::*;
