use crate::domain::ids::DriverId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Failure taxonomy shared by every ledger operation.
///
/// Each variant is scoped to a single operation; none is fatal to the
/// process and none is retried internally. A failed call leaves all
/// records in their pre-call state.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error("settlement conflict: {0}")]
    SettlementConflict(String),
    #[error("no pending payments for driver {0}")]
    NoPendingPayments(DriverId),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}
