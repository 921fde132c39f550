use std::time::Duration;

use vcanchor_core::Retryable;
use vcanchor_ledger::LedgerError;

/// Errors from the external fact oracle.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle transport error: {0}")]
    Transport(String),

    #[error("oracle query timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("oracle configuration error: {0}")]
    Configuration(String),
}

impl Retryable for OracleError {
    fn is_retryable(&self) -> bool {
        matches!(self, OracleError::Transport(_) | OracleError::Timeout(_))
    }
}

/// Errors from the sequence counter store.
#[derive(Debug, thiserror::Error)]
pub enum SequenceError {
    #[error("failed to read counter: {0}")]
    Read(String),

    #[error("stored counter is corrupt: {0}")]
    Corrupt(String),

    #[error("failed to persist counter: {0}")]
    Write(String),

    #[error("sequence space exhausted")]
    Exhausted,

    #[error("sequence lock poisoned")]
    Poisoned,

    #[error("sequence allocation interrupted: {0}")]
    Interrupted(String),
}

/// Issuance pipeline errors. Each variant maps to one HTTP status class.
#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    #[error("{0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("signing failed: {0}")]
    Signing(String),
}
