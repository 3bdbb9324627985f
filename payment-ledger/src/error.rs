//! Error types for the ledger

use crate::types::AttemptStatus;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Storage error (RocksDB)
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Status transition rejected by the attempt state machine
    #[error("invalid transition {from} -> {to} for transaction {transaction_id}")]
    InvalidTransition {
        /// Idempotency key of the attempt
        transaction_id: String,
        /// Stored status
        from: AttemptStatus,
        /// Requested status
        to: AttemptStatus,
    },

    /// Record is missing a field required on insert
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl LedgerError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Storage(_) | LedgerError::Serialization(_) | LedgerError::Io(_) => {
                "LEDGER_WRITE_FAILURE"
            }
            LedgerError::InvalidTransition { .. } => "INVALID_TRANSITION",
            LedgerError::InvalidRecord(_) => "INVALID_RECORD",
        }
    }
}
